use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::now_millis;
use crate::domains::{AlarmFired, AlarmMode, AlarmPayload, PendingAlarm};
use crate::error::{ReminderError, Result};
use crate::interfaces::alarms::AlarmScheduler;

struct Registration {
    generation: u64,
    fire_at: i64,
    mode: AlarmMode,
    payload: AlarmPayload,
    timer: JoinHandle<()>,
}

type Registry = Arc<Mutex<HashMap<i32, Registration>>>;

/// One-shot alarms on tokio timers. The registry is process memory only, so
/// a restart loses every registration.
///
/// Inexact registrations keep the requested fire time but may go off up to
/// `inexact_slack` later.
pub struct TokioAlarmScheduler {
    registry: Registry,
    fired_tx: mpsc::UnboundedSender<AlarmFired>,
    exact_allowed: AtomicBool,
    inexact_slack_ms: i64,
    generation: AtomicU64,
}

impl TokioAlarmScheduler {
    pub fn new(
        exact_allowed: bool,
        inexact_slack: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<AlarmFired>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            fired_tx,
            exact_allowed: AtomicBool::new(exact_allowed),
            inexact_slack_ms: i64::try_from(inexact_slack.as_millis()).unwrap_or(i64::MAX),
            generation: AtomicU64::new(0),
        };
        (scheduler, fired_rx)
    }

    pub fn set_exact_allowed(&self, allowed: bool) {
        self.exact_allowed.store(allowed, Ordering::SeqCst);
    }

    pub fn exact_allowed(&self) -> bool {
        self.exact_allowed.load(Ordering::SeqCst)
    }

    pub async fn pending(&self) -> Vec<PendingAlarm> {
        let registry = self.registry.lock().await;
        let mut alarms: Vec<PendingAlarm> = registry
            .iter()
            .map(|(key, registration)| pending_view(*key, registration))
            .collect();
        alarms.sort_by_key(|alarm| (alarm.fire_at, alarm.key));
        alarms
    }

    pub async fn pending_for(&self, key: i32) -> Option<PendingAlarm> {
        let registry = self.registry.lock().await;
        registry
            .get(&key)
            .map(|registration| pending_view(key, registration))
    }

    /// Drops every registration without firing.
    pub async fn clear(&self) -> usize {
        let mut registry = self.registry.lock().await;
        let count = registry.len();
        for (_, registration) in registry.drain() {
            registration.timer.abort();
        }
        count
    }

    async fn register(&self, key: i32, fire_at: i64, mode: AlarmMode, payload: AlarmPayload) {
        let slack = match mode {
            AlarmMode::Exact => 0,
            AlarmMode::Inexact => self.inexact_slack_ms,
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut registry = self.registry.lock().await;
        if let Some(previous) = registry.remove(&key) {
            previous.timer.abort();
        }

        let remaining = fire_at.saturating_add(slack).saturating_sub(now_millis());
        let delay = Duration::from_millis(remaining.max(0) as u64);
        let timer = tokio::spawn(fire_after(
            self.registry.clone(),
            self.fired_tx.clone(),
            key,
            generation,
            delay,
        ));
        debug!(task_id = key, fire_at, ?mode, "alarm registered");
        registry.insert(
            key,
            Registration {
                generation,
                fire_at,
                mode,
                payload,
                timer,
            },
        );
    }
}

async fn fire_after(
    registry: Registry,
    fired_tx: mpsc::UnboundedSender<AlarmFired>,
    key: i32,
    generation: u64,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    let payload = {
        let mut registry = registry.lock().await;
        // A replacement registered after this timer started owns the slot now.
        match registry.get(&key) {
            Some(current) if current.generation == generation => {
                registry.remove(&key).map(|registration| registration.payload)
            }
            _ => None,
        }
    };
    if let Some(payload) = payload {
        debug!(task_id = key, "alarm fired");
        let _ = fired_tx.send(AlarmFired {
            task_id: payload.task_id,
            description: payload.description,
        });
    }
}

fn pending_view(key: i32, registration: &Registration) -> PendingAlarm {
    PendingAlarm {
        key,
        fire_at: registration.fire_at,
        mode: registration.mode,
        payload: registration.payload.clone(),
    }
}

#[async_trait]
impl AlarmScheduler for TokioAlarmScheduler {
    async fn schedule_exact(&self, key: i32, at_millis: i64, payload: AlarmPayload) -> Result<()> {
        if !self.exact_allowed() {
            return Err(ReminderError::PermissionDenied(
                "exact alarms are disabled".to_string(),
            ));
        }
        self.register(key, at_millis, AlarmMode::Exact, payload)
            .await;
        Ok(())
    }

    async fn schedule_inexact(
        &self,
        key: i32,
        at_millis: i64,
        payload: AlarmPayload,
    ) -> Result<()> {
        self.register(key, at_millis, AlarmMode::Inexact, payload)
            .await;
        Ok(())
    }

    async fn cancel(&self, key: i32) -> Result<()> {
        let mut registry = self.registry.lock().await;
        if let Some(registration) = registry.remove(&key) {
            registration.timer.abort();
            debug!(task_id = key, "alarm cancelled");
        }
        Ok(())
    }
}

impl Drop for TokioAlarmScheduler {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.try_lock() {
            for (_, registration) in registry.drain() {
                registration.timer.abort();
            }
        }
    }
}
