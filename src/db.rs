use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::SimpleAsyncConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{ReminderError, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
pub type SqlitePool = Pool<SqliteAsyncConn>;
pub type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

/// How long a connection waits on a competing writer before giving up with
/// `database is locked`.
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

pub async fn open_pool(sqlite_path: &str) -> Result<SqlitePool> {
    ensure_parent_dir(sqlite_path)?;
    run_migrations(sqlite_path).await?;

    let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
    Pool::builder()
        .build(manager)
        .await
        .map_err(|e| ReminderError::Store(e.to_string()))
}

pub async fn checkout(pool: &SqlitePool) -> Result<SqlitePooledConn<'_>> {
    let mut conn = pool
        .get()
        .await
        .map_err(|e| ReminderError::Store(e.to_string()))?;
    apply_busy_timeout_async(&mut conn).await?;
    Ok(conn)
}

pub async fn apply_busy_timeout_async(conn: &mut SqliteAsyncConn) -> Result<()> {
    conn.batch_execute(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))
        .await
        .map_err(|e| ReminderError::Store(e.to_string()))?;
    Ok(())
}

pub fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ReminderError::Store(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        // Readers must not fail while another connection commits.
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}; PRAGMA journal_mode = WAL;"
        ))
        .map_err(|e| ReminderError::Store(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        Ok::<_, ReminderError>(())
    })
    .await
    .map_err(|e| ReminderError::Runtime(e.to_string()))??;
    Ok(())
}

pub fn default_db_path() -> String {
    "./data/todo-reminders.db".to_string()
}
