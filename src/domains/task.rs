use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub user_id: i32,
    pub list_id: i32,
    pub description: String,
    pub is_completed: bool,
    /// Absolute fire time in epoch milliseconds; `None` means no reminder.
    pub reminder_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// A reminder alarm may exist only for an open task whose reminder lies
    /// strictly after `now`.
    pub fn is_reminder_eligible(&self, now: i64) -> bool {
        !self.is_completed && self.reminder_at.is_some_and(|at| at > now)
    }

    pub fn has_pending_reminder(&self) -> bool {
        !self.is_completed && self.reminder_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub list_id: i32,
    pub description: String,
    #[serde(default)]
    pub reminder_at: Option<i64>,
}
