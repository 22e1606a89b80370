diesel::table! {
    todos (id) {
        id -> Integer,
        user_id -> Integer,
        list_id -> Integer,
        description -> Text,
        is_completed -> Bool,
        reminder_at -> Nullable<BigInt>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}
