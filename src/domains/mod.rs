pub mod notification;
pub mod preferences;
pub mod task;

pub use notification::{
    AlarmFired, AlarmMode, AlarmPayload, NotificationResponse, PendingAlarm, ReminderAction,
    ReminderEvent, ReminderNotification, REMINDER_TITLE,
};
pub use preferences::NotificationPreferences;
pub use task::{NewTask, Task};
