use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::clock::{minutes_from_now, now_millis};
use crate::domains::{
    NotificationResponse, ReminderAction, ReminderEvent, ReminderNotification, Task,
};
use crate::error::Result;
use crate::interfaces::notifications::NotificationPresenter;
use crate::interfaces::stores::{SettingsStore, TaskStore};
use crate::services::reminder_scheduler::ReminderScheduler;

pub const SNOOZE_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(Task),
    Snoozed(Task),
    /// The task was deleted after its alarm was registered.
    TaskMissing,
    Failed,
}

/// Turns fired alarms into notifications and applies the user's response to
/// the task store. Nothing here returns an error to the trigger: failures are
/// logged and the notification is still dismissed.
pub struct DeliveryHandler {
    tasks: Arc<dyn TaskStore>,
    settings: Arc<dyn SettingsStore>,
    reminders: Arc<ReminderScheduler>,
    presenter: Arc<dyn NotificationPresenter>,
    events: Option<broadcast::Sender<ReminderEvent>>,
}

impl DeliveryHandler {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        settings: Arc<dyn SettingsStore>,
        reminders: Arc<ReminderScheduler>,
        presenter: Arc<dyn NotificationPresenter>,
    ) -> Self {
        Self {
            tasks,
            settings,
            reminders,
            presenter,
            events: None,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<ReminderEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn on_alarm_fired(&self, task_id: i32, description: &str) {
        let notification = ReminderNotification::for_task(task_id, description);
        match self.presenter.show(&notification).await {
            Ok(()) => {
                info!(task_id, "reminder delivered");
                self.publish("shown", task_id, json!({"description": description}));
            }
            Err(err) => {
                warn!(task_id, error = %err, "failed to display reminder");
                self.publish("shown", task_id, json!({"error": err.to_string()}));
            }
        }
    }

    pub async fn on_notification_action(
        &self,
        action: ReminderAction,
        task_id: i32,
    ) -> ActionOutcome {
        let result = match action {
            ReminderAction::Complete => self.complete(task_id).await,
            ReminderAction::Snooze => self.snooze(task_id).await,
        };
        let outcome = result.unwrap_or_else(|err| {
            warn!(task_id, action = action.id(), error = %err, "reminder action failed");
            ActionOutcome::Failed
        });

        if let Err(err) = self.presenter.dismiss(task_id).await {
            warn!(task_id, error = %err, "failed to dismiss reminder notification");
        }

        let (status, payload) = match &outcome {
            ActionOutcome::Completed(_) => ("ok", json!({})),
            ActionOutcome::Snoozed(task) => ("ok", json!({"reminder_at": task.reminder_at})),
            ActionOutcome::TaskMissing => ("missing", json!({})),
            ActionOutcome::Failed => ("error", json!({})),
        };
        let event_type = match action {
            ReminderAction::Complete => "completed",
            ReminderAction::Snooze => "snoozed",
        };
        self.publish_with_status(event_type, task_id, status, payload);
        outcome
    }

    pub async fn on_notification_opened(&self, task_id: i32) {
        self.publish("opened", task_id, json!({}));
    }

    pub async fn handle_response(&self, response: NotificationResponse) {
        match response {
            NotificationResponse::Action { action, task_id } => {
                self.on_notification_action(action, task_id).await;
            }
            NotificationResponse::Opened { task_id } => {
                self.on_notification_opened(task_id).await;
            }
        }
    }

    async fn complete(&self, task_id: i32) -> Result<ActionOutcome> {
        let Some(mut task) = self.tasks.get_by_id(task_id).await? else {
            return Ok(ActionOutcome::TaskMissing);
        };
        task.is_completed = true;
        self.tasks.update(&task).await?;
        self.reminders.cancel(task_id).await?;
        Ok(ActionOutcome::Completed(task))
    }

    async fn snooze(&self, task_id: i32) -> Result<ActionOutcome> {
        let Some(mut task) = self.tasks.get_by_id(task_id).await? else {
            return Ok(ActionOutcome::TaskMissing);
        };
        task.reminder_at = Some(minutes_from_now(SNOOZE_MINUTES));
        self.tasks.update(&task).await?;
        // Reminders switched off while the notification was up: keep the new
        // time for the next settings sync but register nothing now.
        if self.reminders_allowed().await {
            self.reminders.schedule(&task).await?;
        } else {
            info!(task_id, "reminders disabled, snoozed without an alarm");
        }
        Ok(ActionOutcome::Snoozed(task))
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

    fn publish(&self, event_type: &str, task_id: i32, payload: serde_json::Value) {
        let status = if payload.get("error").is_some() {
            "error"
        } else {
            "ok"
        };
        self.publish_with_status(event_type, task_id, status, payload);
    }

    fn publish_with_status(
        &self,
        event_type: &str,
        task_id: i32,
        status: &str,
        payload: serde_json::Value,
    ) {
        let Some(events) = &self.events else {
            return;
        };
        let _ = events.send(ReminderEvent {
            event_type: event_type.to_string(),
            task_id,
            status: status.to_string(),
            payload,
            timestamp: now_millis(),
        });
    }
}
