use serde::{Deserialize, Serialize};

pub const DEFAULT_REMINDER_LEAD_MINUTES: i32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub enabled: bool,
    pub reminder_enabled: bool,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub daily_summary: bool,
    pub reminder_lead_minutes: i32,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_enabled: true,
            sound_enabled: true,
            vibration_enabled: true,
            daily_summary: false,
            reminder_lead_minutes: DEFAULT_REMINDER_LEAD_MINUTES,
        }
    }
}

impl NotificationPreferences {
    /// Both the master switch and the reminder switch must be on for any
    /// task alarm to exist.
    pub fn reminders_allowed(&self) -> bool {
        self.enabled && self.reminder_enabled
    }

    /// The pair of flags the settings monitor reacts to.
    pub fn reminder_gate(&self) -> (bool, bool) {
        (self.enabled, self.reminder_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_reminders() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.reminders_allowed());
        assert!(!prefs.daily_summary);
        assert_eq!(prefs.reminder_lead_minutes, DEFAULT_REMINDER_LEAD_MINUTES);
    }

    #[test]
    fn either_switch_blocks_reminders() {
        let master_off = NotificationPreferences {
            enabled: false,
            ..Default::default()
        };
        let reminders_off = NotificationPreferences {
            reminder_enabled: false,
            ..Default::default()
        };
        assert!(!master_off.reminders_allowed());
        assert!(!reminders_off.reminders_allowed());
    }
}
