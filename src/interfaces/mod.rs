pub mod alarms;
pub mod notifications;
pub mod stores;
