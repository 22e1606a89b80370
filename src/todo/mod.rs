use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::clock::now_millis;
use crate::db::{self, SqlitePool, SqlitePooledConn};
use crate::domains::{NewTask, Task};
use crate::error::{ReminderError, Result};
use crate::interfaces::stores::TaskStore;

mod schema;
use schema::todos;

diesel::define_sql_function! {
    fn last_insert_rowid() -> diesel::sql_types::BigInt;
}

#[derive(Queryable)]
struct TodoRow {
    id: i32,
    user_id: i32,
    list_id: i32,
    description: String,
    is_completed: bool,
    reminder_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = todos)]
struct NewTodo<'a> {
    user_id: i32,
    list_id: i32,
    description: &'a str,
    is_completed: bool,
    reminder_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

pub struct TodoStore {
    pool: SqlitePool,
}

impl TodoStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = db::open_pool(sqlite_path.as_ref()).await?;
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        db::checkout(&self.pool).await
    }
}

#[async_trait]
impl TaskStore for TodoStore {
    async fn insert(&self, user_id: i32, task: NewTask) -> Result<Task> {
        let now = now_millis();
        let new = NewTodo {
            user_id,
            list_id: task.list_id,
            description: &task.description,
            is_completed: false,
            reminder_at: task.reminder_at,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(todos::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;

        // last_insert_rowid() is scoped to this pooled connection.
        let id: i64 = diesel::select(last_insert_rowid())
            .get_result(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        let id = i32::try_from(id).map_err(|e| ReminderError::Store(e.to_string()))?;
        let row: TodoRow = todos::table
            .filter(todos::id.eq(id))
            .first(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        Ok(map_row(row))
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Task>> {
        let mut conn = self.conn().await?;
        let row: Option<TodoRow> = todos::table
            .filter(todos::id.eq(id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        Ok(row.map(map_row))
    }

    async fn pending_reminders(&self, after: Option<i64>) -> Result<Vec<Task>> {
        let mut conn = self.conn().await?;
        let mut query = todos::table
            .filter(todos::is_completed.eq(false))
            .filter(todos::reminder_at.is_not_null())
            .into_boxed();
        if let Some(after) = after {
            query = query.filter(todos::reminder_at.gt(after));
        }

        let rows: Vec<TodoRow> = query
            .order(todos::reminder_at.asc())
            .load(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        Ok(rows.into_iter().map(map_row).collect())
    }

    async fn list(&self, user_id: i32, list_id: Option<i32>) -> Result<Vec<Task>> {
        let mut conn = self.conn().await?;
        let mut query = todos::table
            .filter(todos::user_id.eq(user_id))
            .into_boxed();
        if let Some(list_id) = list_id {
            query = query.filter(todos::list_id.eq(list_id));
        }

        let rows: Vec<TodoRow> = query
            .order(todos::id.asc())
            .load(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        Ok(rows.into_iter().map(map_row).collect())
    }

    async fn update(&self, task: &Task) -> Result<()> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(todos::table.filter(todos::id.eq(task.id)))
            .set((
                todos::list_id.eq(task.list_id),
                todos::description.eq(&task.description),
                todos::is_completed.eq(task.is_completed),
                todos::reminder_at.eq(task.reminder_at),
                todos::updated_at.eq(now_millis()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        if updated == 0 {
            return Err(ReminderError::NotFound(task.id));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let mut conn = self.conn().await?;
        let count = diesel::delete(todos::table.filter(todos::id.eq(id)))
            .execute(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        Ok(count > 0)
    }
}

fn map_row(row: TodoRow) -> Task {
    Task {
        id: row.id,
        user_id: row.user_id,
        list_id: row.list_id,
        description: row.description,
        is_completed: row.is_completed,
        reminder_at: row.reminder_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
