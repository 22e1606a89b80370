use async_trait::async_trait;

use crate::domains::ReminderNotification;
use crate::error::Result;

#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    async fn show(&self, notification: &ReminderNotification) -> Result<()>;

    async fn dismiss(&self, notification_id: i32) -> Result<()>;
}
