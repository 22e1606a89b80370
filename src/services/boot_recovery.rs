use std::sync::Arc;

use tracing::{info, warn};

use crate::interfaces::stores::{SettingsStore, TaskStore};
use crate::services::reminder_scheduler::{ReminderScheduler, ScheduleOutcome};

/// Re-creates alarms after a restart, since the alarm registry does not
/// survive one.
pub struct BootRecovery {
    tasks: Arc<dyn TaskStore>,
    settings: Arc<dyn SettingsStore>,
    reminders: Arc<ReminderScheduler>,
}

impl BootRecovery {
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

    /// Best effort: past-due reminders are left to `schedule` to skip, and a
    /// failure on one task does not stop the rest.
    pub async fn on_boot_completed(&self) {
        match self.settings.current().await {
            Ok(prefs) if !prefs.reminders_allowed() => {
                info!("reminders disabled, skipping boot recovery");
                return;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "failed to read notification preferences, recovering anyway");
            }
        }

        let pending = match self.tasks.pending_reminders(None).await {
            Ok(pending) => pending,
            Err(err) => {
                warn!(error = %err, "failed to load pending reminders");
                return;
            }
        };

        let total = pending.len();
        let mut restored = 0;
        for task in pending {
            match self.reminders.schedule(&task).await {
                Ok(ScheduleOutcome::Registered(_)) => restored += 1,
                Ok(ScheduleOutcome::Ineligible) => {}
                Err(err) => {
                    warn!(task_id = task.id, error = %err, "failed to restore reminder");
                }
            }
        }
        info!(total, restored, "boot recovery finished");
    }
}
