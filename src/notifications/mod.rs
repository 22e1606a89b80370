use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notify_rust::Notification;
use tokio::sync::mpsc;
#[cfg(all(unix, not(target_os = "macos")))]
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::domains::{NotificationResponse, ReminderNotification};
use crate::error::{ReminderError, Result};
use crate::interfaces::notifications::NotificationPresenter;

const OPEN_ACTION: &str = "default";

/// Native desktop notifications. On freedesktop platforms the Complete and
/// Snooze buttons are live and their clicks arrive on the response channel.
#[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
pub struct DesktopNotifier {
    app_name: String,
    responses: mpsc::UnboundedSender<NotificationResponse>,
    // task id -> id assigned by the notification server
    shown: Arc<Mutex<HashMap<i32, u32>>>,
}

impl DesktopNotifier {
    pub fn new(app_name: &str) -> (Self, mpsc::UnboundedReceiver<NotificationResponse>) {
        let (responses, rx) = mpsc::unbounded_channel();
        let notifier = Self {
            app_name: app_name.to_string(),
            responses,
            shown: Arc::new(Mutex::new(HashMap::new())),
        };
        (notifier, rx)
    }

    fn build(&self, notification: &ReminderNotification) -> Notification {
        let mut native = Notification::new();
        native
            .appname(&self.app_name)
            .summary(&notification.title)
            .body(&notification.body)
            .action(OPEN_ACTION, "Open");
        for action in &notification.actions {
            native.action(action.id(), action.label());
        }
        native
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
#[async_trait]
impl NotificationPresenter for DesktopNotifier {
    async fn show(&self, notification: &ReminderNotification) -> Result<()> {
        let native = self.build(notification);
        let task_id = notification.open_task_id;
        let slot = notification.id;
        let responses = self.responses.clone();
        let shown = self.shown.clone();
        let (shown_tx, shown_rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            let handle = match native.show() {
                Ok(handle) => handle,
                Err(err) => {
                    let _ = shown_tx.send(Err(ReminderError::Runtime(err.to_string())));
                    return;
                }
            };
            if let Ok(mut guard) = shown.lock() {
                guard.insert(slot, handle.id());
            }
            let _ = shown_tx.send(Ok(()));

            handle.wait_for_action(|action| {
                let response = match action {
                    OPEN_ACTION => Some(NotificationResponse::Opened { task_id }),
                    other => other
                        .parse()
                        .ok()
                        .map(|action| NotificationResponse::Action { action, task_id }),
                };
                if let Some(response) = response {
                    let _ = responses.send(response);
                }
            });
        });

        shown_rx
            .await
            .map_err(|e| ReminderError::Runtime(e.to_string()))?
    }

    async fn dismiss(&self, notification_id: i32) -> Result<()> {
        let server_id = self
            .shown
            .lock()
            .map_err(|e| ReminderError::Runtime(e.to_string()))?
            .remove(&notification_id);
        let Some(server_id) = server_id else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || {
            // Re-targeting the server id replaces the bubble, which can then be closed.
            let mut native = Notification::new();
            native.id(server_id);
            native.show().map(|handle| handle.close())
        })
        .await
        .map_err(|e| ReminderError::Runtime(e.to_string()))?
        .map_err(|e| ReminderError::Runtime(e.to_string()))?;
        Ok(())
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
#[async_trait]
impl NotificationPresenter for DesktopNotifier {
    async fn show(&self, notification: &ReminderNotification) -> Result<()> {
        let native = self.build(notification);
        tokio::task::spawn_blocking(move || native.show().map(|_| ()))
            .await
            .map_err(|e| ReminderError::Runtime(e.to_string()))?
            .map_err(|e| ReminderError::Runtime(e.to_string()))?;
        Ok(())
    }

    async fn dismiss(&self, notification_id: i32) -> Result<()> {
        debug!(notification_id, "desktop dismiss is not supported on this platform");
        Ok(())
    }
}

/// Headless presenter that only logs.
#[derive(Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationPresenter for LogNotifier {
    async fn show(&self, notification: &ReminderNotification) -> Result<()> {
        info!(
            notification_id = notification.id,
            title = %notification.title,
            body = %notification.body,
            "reminder notification"
        );
        Ok(())
    }

    async fn dismiss(&self, notification_id: i32) -> Result<()> {
        debug!(notification_id, "reminder notification dismissed");
        Ok(())
    }
}
