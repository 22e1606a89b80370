#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use todo_reminders::db;
use todo_reminders::domains::{AlarmMode, AlarmPayload, ReminderNotification};
use todo_reminders::error::{ReminderError, Result};
use todo_reminders::interfaces::alarms::AlarmScheduler;
use todo_reminders::interfaces::notifications::NotificationPresenter;
use todo_reminders::settings::PreferencesStore;
use todo_reminders::todo::TodoStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmCall {
    Exact(i32, i64),
    Inexact(i32, i64),
    Cancel(i32),
}

/// Alarm registry that remembers every call made against it.
#[derive(Default)]
pub struct RecordingAlarms {
    deny_exact: AtomicBool,
    failing_keys: Mutex<HashSet<i32>>,
    registered: Mutex<HashMap<i32, (i64, AlarmMode)>>,
    calls: Mutex<Vec<AlarmCall>>,
}

impl RecordingAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denying_exact() -> Self {
        let alarms = Self::default();
        alarms.deny_exact.store(true, Ordering::SeqCst);
        alarms
    }

    pub fn fail_key(&self, key: i32) {
        self.failing_keys.lock().unwrap().insert(key);
    }

    pub fn registered(&self, key: i32) -> Option<(i64, AlarmMode)> {
        self.registered.lock().unwrap().get(&key).copied()
    }

    pub fn registered_count(&self) -> usize {
        self.registered.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<AlarmCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn schedule_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, AlarmCall::Exact(..) | AlarmCall::Inexact(..)))
            .count()
    }

    pub fn cancel_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, AlarmCall::Cancel(_)))
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Forget every registration, as a reboot would.
    pub fn wipe(&self) {
        self.registered.lock().unwrap().clear();
    }

    fn check_failure(&self, key: i32) -> Result<()> {
        if self.failing_keys.lock().unwrap().contains(&key) {
            return Err(ReminderError::Runtime(format!("alarm service rejected {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AlarmScheduler for RecordingAlarms {
    async fn schedule_exact(&self, key: i32, at_millis: i64, _payload: AlarmPayload) -> Result<()> {
        if self.deny_exact.load(Ordering::SeqCst) {
            return Err(ReminderError::PermissionDenied("denied".to_string()));
        }
        self.check_failure(key)?;
        self.calls
            .lock()
            .unwrap()
            .push(AlarmCall::Exact(key, at_millis));
        self.registered
            .lock()
            .unwrap()
            .insert(key, (at_millis, AlarmMode::Exact));
        Ok(())
    }

    async fn schedule_inexact(
        &self,
        key: i32,
        at_millis: i64,
        _payload: AlarmPayload,
    ) -> Result<()> {
        self.check_failure(key)?;
        self.calls
            .lock()
            .unwrap()
            .push(AlarmCall::Inexact(key, at_millis));
        self.registered
            .lock()
            .unwrap()
            .insert(key, (at_millis, AlarmMode::Inexact));
        Ok(())
    }

    async fn cancel(&self, key: i32) -> Result<()> {
        self.check_failure(key)?;
        self.calls.lock().unwrap().push(AlarmCall::Cancel(key));
        self.registered.lock().unwrap().remove(&key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub shown: Mutex<Vec<ReminderNotification>>,
    pub dismissed: Mutex<Vec<i32>>,
    fail_show: AtomicBool,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let presenter = Self::default();
        presenter.fail_show.store(true, Ordering::SeqCst);
        presenter
    }

    pub fn shown(&self) -> Vec<ReminderNotification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn dismissed(&self) -> Vec<i32> {
        self.dismissed.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPresenter for RecordingPresenter {
    async fn show(&self, notification: &ReminderNotification) -> Result<()> {
        if self.fail_show.load(Ordering::SeqCst) {
            return Err(ReminderError::Runtime("no notification server".to_string()));
        }
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn dismiss(&self, notification_id: i32) -> Result<()> {
        self.dismissed.lock().unwrap().push(notification_id);
        Ok(())
    }
}

pub struct Stores {
    pub db: NamedTempFile,
    pub tasks: Arc<TodoStore>,
    pub settings: Arc<PreferencesStore>,
}

pub async fn open_stores() -> Stores {
    let db = NamedTempFile::new().unwrap();
    let path = db.path().to_str().unwrap().to_string();
    let pool = db::open_pool(&path).await.unwrap();
    let tasks = Arc::new(TodoStore::with_pool(pool.clone()));
    let settings = Arc::new(PreferencesStore::with_pool(pool).await.unwrap());
    Stores {
        db,
        tasks,
        settings,
    }
}

/// Polls `check` until it holds or roughly two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

pub fn task(id: i32, reminder_at: Option<i64>, is_completed: bool) -> todo_reminders::domains::Task {
    todo_reminders::domains::Task {
        id,
        user_id: 1,
        list_id: 1,
        description: format!("task {id}"),
        is_completed,
        reminder_at,
        created_at: 0,
        updated_at: 0,
    }
}
