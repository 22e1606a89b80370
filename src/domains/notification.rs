use serde::{Deserialize, Serialize};

pub const REMINDER_TITLE: &str = "Todo Reminder";

/// Minimal data an alarm carries so delivery does not need the store to
/// render the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub task_id: i32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmMode {
    Exact,
    Inexact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAlarm {
    pub key: i32,
    pub fire_at: i64,
    pub mode: AlarmMode,
    pub payload: AlarmPayload,
}

/// Emitted by the alarm scheduler when a registration reaches its fire time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFired {
    pub task_id: i32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderAction {
    Complete,
    Snooze,
}

impl ReminderAction {
    pub const ALL: [ReminderAction; 2] = [ReminderAction::Complete, ReminderAction::Snooze];

    pub fn id(self) -> &'static str {
        match self {
            ReminderAction::Complete => "complete",
            ReminderAction::Snooze => "snooze",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReminderAction::Complete => "Complete",
            ReminderAction::Snooze => "Snooze",
        }
    }
}

impl std::str::FromStr for ReminderAction {
    type Err = ();

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "complete" | "done" => Ok(ReminderAction::Complete),
            "snooze" => Ok(ReminderAction::Snooze),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderNotification {
    /// Notification slot; one per task.
    pub id: i32,
    pub title: String,
    pub body: String,
    /// Task opened by the default tap action.
    pub open_task_id: i32,
    pub actions: Vec<ReminderAction>,
}

impl ReminderNotification {
    pub fn for_task(task_id: i32, description: &str) -> Self {
        Self {
            id: task_id,
            title: REMINDER_TITLE.to_string(),
            body: description.to_string(),
            open_task_id: task_id,
            actions: ReminderAction::ALL.to_vec(),
        }
    }
}

/// What the user did with a displayed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationResponse {
    Action {
        action: ReminderAction,
        task_id: i32,
    },
    Opened {
        task_id: i32,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderEvent {
    pub event_type: String,
    pub task_id: i32,
    pub status: String,
    pub payload: serde_json::Value,
    pub timestamp: i64,
}
