use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use futures::stream::BoxStream;
use tokio::sync::{watch, Mutex};

use crate::clock::now_millis;
use crate::db::{self, SqlitePool, SqlitePooledConn};
use crate::domains::NotificationPreferences;
use crate::error::{ReminderError, Result};
use crate::interfaces::stores::SettingsStore;

mod schema;
use schema::notification_preferences;

const PREFERENCES_ROW_ID: i32 = 1;

#[derive(Queryable, Insertable)]
#[diesel(table_name = notification_preferences)]
struct PreferencesRow {
    id: i32,
    enabled: bool,
    reminder_enabled: bool,
    sound_enabled: bool,
    vibration_enabled: bool,
    daily_summary: bool,
    reminder_lead_minutes: i32,
    updated_at: i64,
}

impl PreferencesRow {
    fn from_prefs(prefs: &NotificationPreferences) -> Self {
        Self {
            id: PREFERENCES_ROW_ID,
            enabled: prefs.enabled,
            reminder_enabled: prefs.reminder_enabled,
            sound_enabled: prefs.sound_enabled,
            vibration_enabled: prefs.vibration_enabled,
            daily_summary: prefs.daily_summary,
            reminder_lead_minutes: prefs.reminder_lead_minutes,
            updated_at: now_millis(),
        }
    }

    fn into_prefs(self) -> NotificationPreferences {
        NotificationPreferences {
            enabled: self.enabled,
            reminder_enabled: self.reminder_enabled,
            sound_enabled: self.sound_enabled,
            vibration_enabled: self.vibration_enabled,
            daily_summary: self.daily_summary,
            reminder_lead_minutes: self.reminder_lead_minutes,
        }
    }
}

/// Single-row preferences table fronted by a watch channel so observers see
/// every committed update.
pub struct PreferencesStore {
    pool: SqlitePool,
    tx: watch::Sender<NotificationPreferences>,
    // Serialises writers so the stored row and the watch value agree.
    write_lock: Mutex<()>,
}

impl PreferencesStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let pool = db::open_pool(sqlite_path.as_ref()).await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let prefs = {
            let mut conn = db::checkout(&pool).await?;
            load_or_init(&mut conn).await?
        };
        let (tx, _) = watch::channel(prefs);
        Ok(Self {
            pool,
            tx,
            write_lock: Mutex::new(()),
        })
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        db::checkout(&self.pool).await
    }
}

#[async_trait]
impl SettingsStore for PreferencesStore {
    async fn current(&self) -> Result<NotificationPreferences> {
        Ok(self.tx.borrow().clone())
    }

    fn observe(&self) -> BoxStream<'static, NotificationPreferences> {
        let mut rx = self.tx.subscribe();
        Box::pin(async_stream::stream! {
            let current = rx.borrow_and_update().clone();
            yield current;
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                yield next;
            }
        })
    }

    async fn update(&self, prefs: NotificationPreferences) -> Result<()> {
        let row = PreferencesRow::from_prefs(&prefs);
        let _guard = self.write_lock.lock().await;
        let mut conn = self.conn().await?;
        diesel::replace_into(notification_preferences::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;
        self.tx.send_replace(prefs);
        Ok(())
    }
}

async fn load_or_init(conn: &mut SqlitePooledConn<'_>) -> Result<NotificationPreferences> {
    let row: Option<PreferencesRow> = notification_preferences::table
        .filter(notification_preferences::id.eq(PREFERENCES_ROW_ID))
        .first(conn)
        .await
        .optional()
        .map_err(|e| ReminderError::Store(e.to_string()))?;
    if let Some(row) = row {
        return Ok(row.into_prefs());
    }

    let defaults = NotificationPreferences::default();
    diesel::insert_into(notification_preferences::table)
        .values(&PreferencesRow::from_prefs(&defaults))
        .execute(conn)
        .await
        .map_err(|e| ReminderError::Store(e.to_string()))?;
    Ok(defaults)
}
