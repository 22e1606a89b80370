use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::now_millis;
use crate::domains::{AlarmMode, AlarmPayload, Task};
use crate::error::{ReminderError, Result};
use crate::interfaces::alarms::AlarmScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// No reminder, reminder not in the future, or task completed.
    Ineligible,
    Registered(AlarmMode),
}

/// Decides whether a task should have an alarm and keeps the alarm slot keyed
/// by the task id in line with that decision. Holds no state between calls.
pub struct ReminderScheduler {
    alarms: Arc<dyn AlarmScheduler>,
}

impl ReminderScheduler {
    pub fn new(alarms: Arc<dyn AlarmScheduler>) -> Self {
        Self { alarms }
    }

    /// Registers an alarm at `task.reminder_at` when the task is eligible.
    ///
    /// Callers moving a task out of eligibility are expected to `cancel`
    /// first; this never removes an existing alarm. A refused exact alarm
    /// falls back to inexact scheduling instead of failing.
    pub async fn schedule(&self, task: &Task) -> Result<ScheduleOutcome> {
        let now = now_millis();
        let Some(fire_at) = task.reminder_at.filter(|_| task.is_reminder_eligible(now)) else {
            debug!(task_id = task.id, "task not eligible for a reminder");
            return Ok(ScheduleOutcome::Ineligible);
        };

        let payload = AlarmPayload {
            task_id: task.id,
            description: task.description.clone(),
        };
        match self
            .alarms
            .schedule_exact(task.id, fire_at, payload.clone())
            .await
        {
            Ok(()) => Ok(ScheduleOutcome::Registered(AlarmMode::Exact)),
            Err(ReminderError::PermissionDenied(reason)) => {
                warn!(task_id = task.id, %reason, "exact alarm refused, using inexact alarm");
                self.alarms
                    .schedule_inexact(task.id, fire_at, payload)
                    .await?;
                Ok(ScheduleOutcome::Registered(AlarmMode::Inexact))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn cancel(&self, task_id: i32) -> Result<()> {
        self.alarms.cancel(task_id).await
    }

    pub async fn reschedule(&self, task: &Task) -> Result<ScheduleOutcome> {
        self.cancel(task.id).await?;
        self.schedule(task).await
    }
}
