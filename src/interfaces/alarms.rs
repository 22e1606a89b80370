use async_trait::async_trait;

use crate::domains::AlarmPayload;
use crate::error::Result;

/// One-shot wake-ups keyed by an integer. Registering a key that is already
/// present replaces the earlier registration.
#[async_trait]
pub trait AlarmScheduler: Send + Sync {
    /// Fails with `ReminderError::PermissionDenied` when exact alarms are
    /// not allowed.
    async fn schedule_exact(&self, key: i32, at_millis: i64, payload: AlarmPayload) -> Result<()>;

    async fn schedule_inexact(&self, key: i32, at_millis: i64, payload: AlarmPayload)
        -> Result<()>;

    /// Removing a key with no registration is not an error.
    async fn cancel(&self, key: i32) -> Result<()>;
}
