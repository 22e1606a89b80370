use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::db::default_db_path;
use crate::error::{ReminderError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlarmConfig {
    /// Whether the platform grants exact alarms.
    pub exact_allowed: Option<bool>,
    /// How late an inexact alarm may fire.
    pub inexact_slack_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Show native desktop notifications; otherwise only log them.
    pub desktop: Option<bool>,
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub database_path: Option<String>,
    pub daemon: Option<DaemonConfig>,
    pub alarms: Option<AlarmConfig>,
    pub notifications: Option<NotificationConfig>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ReminderError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ReminderError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn database_path(&self) -> String {
        self.database_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_db_path)
    }

    pub fn host(&self) -> String {
        self.daemon
            .as_ref()
            .and_then(|daemon| daemon.host.clone())
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> u16 {
        self.daemon
            .as_ref()
            .and_then(|daemon| daemon.port)
            .unwrap_or(7879)
    }

    pub fn token(&self) -> String {
        self.daemon
            .as_ref()
            .and_then(|daemon| daemon.token.clone())
            .unwrap_or_default()
    }

    pub fn exact_alarms_allowed(&self) -> bool {
        self.alarms
            .as_ref()
            .and_then(|alarms| alarms.exact_allowed)
            .unwrap_or(true)
    }

    pub fn inexact_slack(&self) -> Duration {
        let seconds = self
            .alarms
            .as_ref()
            .and_then(|alarms| alarms.inexact_slack_seconds)
            .unwrap_or(0);
        Duration::from_secs(seconds)
    }

    pub fn desktop_notifications(&self) -> bool {
        self.notifications
            .as_ref()
            .and_then(|notifications| notifications.desktop)
            .unwrap_or(true)
    }

    pub fn app_name(&self) -> String {
        self.notifications
            .as_ref()
            .and_then(|notifications| notifications.app_name.clone())
            .unwrap_or_else(|| "Todo Reminders".to_string())
    }
}
