use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domains::{NewTask, NotificationPreferences, Task};
use crate::error::Result;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, user_id: i32, task: NewTask) -> Result<Task>;

    async fn get_by_id(&self, id: i32) -> Result<Option<Task>>;

    /// Open tasks with a reminder set, across all users. With `after`, only
    /// reminders strictly later than that instant are returned.
    async fn pending_reminders(&self, after: Option<i64>) -> Result<Vec<Task>>;

    async fn list(&self, user_id: i32, list_id: Option<i32>) -> Result<Vec<Task>>;

    /// Last write wins; fails with `NotFound` when the row is gone.
    async fn update(&self, task: &Task) -> Result<()>;

    async fn delete(&self, id: i32) -> Result<bool>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn current(&self) -> Result<NotificationPreferences>;

    /// Yields the current value immediately, then every stored change.
    fn observe(&self) -> BoxStream<'static, NotificationPreferences>;

    async fn update(&self, prefs: NotificationPreferences) -> Result<()>;
}
