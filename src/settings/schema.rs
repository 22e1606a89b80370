diesel::table! {
    notification_preferences (id) {
        id -> Integer,
        enabled -> Bool,
        reminder_enabled -> Bool,
        sound_enabled -> Bool,
        vibration_enabled -> Bool,
        daily_summary -> Bool,
        reminder_lead_minutes -> Integer,
        updated_at -> BigInt,
    }
}
