pub mod boot_recovery;
pub mod delivery;
pub mod reminder_scheduler;
pub mod settings_monitor;
pub mod todo;

pub use boot_recovery::BootRecovery;
pub use delivery::{ActionOutcome, DeliveryHandler, SNOOZE_MINUTES};
pub use reminder_scheduler::{ReminderScheduler, ScheduleOutcome};
pub use settings_monitor::{SettingsMonitor, SyncSummary};
pub use todo::TodoService;
