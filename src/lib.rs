pub mod alarms;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod db;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod notifications;
pub mod services;
pub mod settings;
pub mod todo;

pub use crate::config::Config;
pub use crate::error::{ReminderError, Result};
