use std::sync::Arc;

use tracing::warn;

use crate::domains::{NewTask, Task};
use crate::error::{ReminderError, Result};
use crate::interfaces::stores::{SettingsStore, TaskStore};
use crate::services::reminder_scheduler::ReminderScheduler;

/// User-initiated task mutations. Each one leaves the task's alarm slot in
/// line with the stored task before returning.
pub struct TodoService {
    tasks: Arc<dyn TaskStore>,
    settings: Arc<dyn SettingsStore>,
    reminders: Arc<ReminderScheduler>,
}

impl TodoService {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        settings: Arc<dyn SettingsStore>,
        reminders: Arc<ReminderScheduler>,
    ) -> Self {
        Self {
            tasks,
            settings,
            reminders,
        }
    }

    pub async fn create(&self, user_id: Option<i32>, new: NewTask) -> Result<Task> {
        let user_id = user_id.ok_or(ReminderError::Unauthenticated)?;
        let task = self.tasks.insert(user_id, new).await?;
        if task.has_pending_reminder() {
            self.sync_alarm(&task).await?;
        }
        Ok(task)
    }

    pub async fn list(&self, user_id: Option<i32>, list_id: Option<i32>) -> Result<Vec<Task>> {
        let user_id = user_id.ok_or(ReminderError::Unauthenticated)?;
        self.tasks.list(user_id, list_id).await
    }

    pub async fn get(&self, task_id: i32) -> Result<Task> {
        self.tasks
            .get_by_id(task_id)
            .await?
            .ok_or(ReminderError::NotFound(task_id))
    }

    pub async fn set_reminder(&self, task_id: i32, reminder_at: Option<i64>) -> Result<Task> {
        let mut task = self.get(task_id).await?;
        task.reminder_at = reminder_at;
        self.tasks.update(&task).await?;
        self.sync_alarm(&task).await?;
        Ok(task)
    }

    pub async fn update_description(&self, task_id: i32, description: &str) -> Result<Task> {
        let mut task = self.get(task_id).await?;
        task.description = description.to_string();
        self.tasks.update(&task).await?;
        // The alarm payload carries the description.
        if task.has_pending_reminder() {
            self.sync_alarm(&task).await?;
        }
        Ok(task)
    }

    pub async fn complete(&self, task_id: i32) -> Result<Task> {
        let mut task = self.get(task_id).await?;
        task.is_completed = true;
        self.tasks.update(&task).await?;
        self.reminders.cancel(task_id).await?;
        Ok(task)
    }

    pub async fn reopen(&self, task_id: i32) -> Result<Task> {
        let mut task = self.get(task_id).await?;
        task.is_completed = false;
        self.tasks.update(&task).await?;
        self.sync_alarm(&task).await?;
        Ok(task)
    }

    pub async fn delete(&self, task_id: i32) -> Result<bool> {
        self.reminders.cancel(task_id).await?;
        self.tasks.delete(task_id).await
    }

    /// Cancel-then-schedule, or cancel only when reminders are switched off.
    async fn sync_alarm(&self, task: &Task) -> Result<()> {
        if self.reminders_allowed().await {
            self.reminders.reschedule(task).await?;
        } else {
            self.reminders.cancel(task.id).await?;
        }
        Ok(())
    }

    async fn reminders_allowed(&self) -> bool {
        match self.settings.current().await {
            Ok(prefs) => prefs.reminders_allowed(),
            Err(err) => {
                warn!(error = %err, "failed to read notification preferences");
                true
            }
        }
    }
}
