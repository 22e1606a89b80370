use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domains::NotificationPreferences;
use crate::interfaces::stores::{SettingsStore, TaskStore};
use crate::services::reminder_scheduler::{ReminderScheduler, ScheduleOutcome};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub scheduled: usize,
    /// Pending tasks whose reminder is already in the past.
    pub skipped: usize,
    pub cancelled: usize,
    pub failed: usize,
}

/// Re-applies the schedule/cancel decision to every pending reminder whenever
/// the notification or reminder switch flips.
pub struct SettingsMonitor {
    settings: Arc<dyn SettingsStore>,
    tasks: Arc<dyn TaskStore>,
    reminders: Arc<ReminderScheduler>,
}

impl SettingsMonitor {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        tasks: Arc<dyn TaskStore>,
        reminders: Arc<ReminderScheduler>,
    ) -> Self {
        Self {
            settings,
            tasks,
            reminders,
        }
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs until the settings stream ends. Values that leave both switches
    /// unchanged are ignored; the first value always triggers a sync.
    pub async fn run(&self) {
        let mut stream = self.settings.observe();
        let mut last_gate = None;
        while let Some(prefs) = stream.next().await {
            let gate = prefs.reminder_gate();
            if last_gate == Some(gate) {
                continue;
            }
            last_gate = Some(gate);
            self.apply(&prefs).await;
        }
    }

    pub async fn apply(&self, prefs: &NotificationPreferences) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let pending = match self.tasks.pending_reminders(None).await {
            Ok(pending) => pending,
            Err(err) => {
                warn!(error = %err, "failed to load pending reminders");
                return summary;
            }
        };

        let allowed = prefs.reminders_allowed();
        for task in pending {
            let result = if allowed {
                self.reminders.schedule(&task).await.map(|outcome| match outcome {
                    ScheduleOutcome::Registered(_) => summary.scheduled += 1,
                    ScheduleOutcome::Ineligible => summary.skipped += 1,
                })
            } else {
                self.reminders
                    .cancel(task.id)
                    .await
                    .map(|()| summary.cancelled += 1)
            };
            if let Err(err) = result {
                summary.failed += 1;
                warn!(task_id = task.id, error = %err, "reminder sync failed");
            }
        }

        info!(
            allowed,
            scheduled = summary.scheduled,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            failed = summary.failed,
            "reminders resynced after settings change"
        );
        summary
    }
}
