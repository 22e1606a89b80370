use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::alarms::TokioAlarmScheduler;
use crate::config::Config;
use crate::db;
use crate::domains::{
    AlarmFired, NewTask, NotificationPreferences, NotificationResponse, ReminderAction,
    ReminderEvent,
};
use crate::error::{ReminderError, Result};
use crate::interfaces::notifications::NotificationPresenter;
use crate::interfaces::stores::{SettingsStore, TaskStore};
use crate::notifications::{DesktopNotifier, LogNotifier};
use crate::services::{
    ActionOutcome, BootRecovery, DeliveryHandler, ReminderScheduler, SettingsMonitor, TodoService,
};
use crate::settings::PreferencesStore;
use crate::todo::TodoStore;

#[derive(Clone)]
pub struct AppState {
    pub todos: Arc<TodoService>,
    pub settings: Arc<dyn SettingsStore>,
    pub delivery: Arc<DeliveryHandler>,
    pub boot: Arc<BootRecovery>,
    pub alarms: Arc<TokioAlarmScheduler>,
    pub token: String,
    pub events: broadcast::Sender<ReminderEvent>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct TaskListQuery {
    user_id: Option<i32>,
    list_id: Option<i32>,
}

#[derive(Deserialize)]
struct CreateTaskRequest {
    user_id: Option<i32>,
    list_id: i32,
    description: String,
    reminder_at: Option<i64>,
}

#[derive(Deserialize)]
struct ReminderRequest {
    reminder_at: Option<i64>,
}

#[derive(Deserialize)]
struct DescriptionRequest {
    description: String,
}

#[derive(Deserialize)]
struct ActionRequest {
    action: String,
}

#[derive(Deserialize)]
struct EventStreamQuery {
    task_id: Option<i32>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", delete(delete_task))
        .route("/tasks/:id/reminder", put(set_reminder))
        .route("/tasks/:id/description", put(set_description))
        .route("/tasks/:id/complete", post(complete_task))
        .route("/tasks/:id/reopen", post(reopen_task))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/notifications/:task_id/action", post(notification_action))
        .route("/boot_completed", post(boot_completed))
        .route("/alarms", get(list_alarms))
        .route("/events", get(event_stream))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaskListQuery>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.todos.list(query.user_id, query.list_id).await {
        Ok(tasks) => (StatusCode::OK, Json(json!({"tasks": tasks}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTaskRequest>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    let new = NewTask {
        list_id: payload.list_id,
        description: payload.description,
        reminder_at: payload.reminder_at,
    };
    match state.todos.create(payload.user_id, new).await {
        Ok(task) => (StatusCode::CREATED, Json(json!({"task": task}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.todos.delete(id).await {
        Ok(deleted) => (StatusCode::OK, Json(json!({"deleted": deleted}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn set_reminder(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<ReminderRequest>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.todos.set_reminder(id, payload.reminder_at).await {
        Ok(task) => (StatusCode::OK, Json(json!({"task": task}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn set_description(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<DescriptionRequest>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.todos.update_description(id, &payload.description).await {
        Ok(task) => (StatusCode::OK, Json(json!({"task": task}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn complete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.todos.complete(id).await {
        Ok(task) => (StatusCode::OK, Json(json!({"task": task}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn reopen_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.todos.reopen(id).await {
        Ok(task) => (StatusCode::OK, Json(json!({"task": task}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_settings(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.settings.current().await {
        Ok(prefs) => (StatusCode::OK, Json(prefs)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(prefs): Json<NotificationPreferences>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    match state.settings.update(prefs.clone()).await {
        Ok(()) => (StatusCode::OK, Json(prefs)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn notification_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<i32>,
    Json(payload): Json<ActionRequest>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    let Ok(action) = payload.action.parse::<ReminderAction>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Unsupported action: {}", payload.action),
            }),
        )
            .into_response();
    };

    let body = match state.delivery.on_notification_action(action, task_id).await {
        ActionOutcome::Completed(task) => json!({"outcome": "completed", "task": task}),
        ActionOutcome::Snoozed(task) => json!({"outcome": "snoozed", "task": task}),
        ActionOutcome::TaskMissing => json!({"outcome": "missing"}),
        ActionOutcome::Failed => json!({"outcome": "failed"}),
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn boot_completed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    state.boot.on_boot_completed().await;
    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}

async fn list_alarms(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }
    let alarms = state.alarms.pending().await;
    (StatusCode::OK, Json(json!({"alarms": alarms}))).into_response()
}

async fn event_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EventStreamQuery>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }

    let mut rx = state.events.subscribe();
    let task_filter = query.task_id;
    let body = Body::from_stream(async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if task_filter.is_some_and(|task_id| task_id != event.task_id) {
                        continue;
                    }
                    if let Ok(payload) = serde_json::to_string(&event) {
                        let line = format!("data: {}\n\n", payload);
                        yield Ok::<Bytes, std::convert::Infallible>(Bytes::from(line));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    (
        [
            ("content-type", "text/event-stream"),
            ("cache-control", "no-cache"),
        ],
        body,
    )
        .into_response()
}

fn authorize(
    headers: &HeaderMap,
    token: &str,
) -> std::result::Result<(), (StatusCode, Json<ErrorResponse>)> {
    let header = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let api_key = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let bearer = header.strip_prefix("Bearer ").unwrap_or("");

    // An unset token never matches, even against empty headers.
    if !token.is_empty() && (bearer == token || api_key == token) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Unauthorized".to_string(),
            }),
        ))
    }
}

fn error_response(err: ReminderError) -> Response {
    let status = match &err {
        ReminderError::NotFound(_) => StatusCode::NOT_FOUND,
        ReminderError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ReminderError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// Delivers each fired alarm on its own task so a slow presenter never
/// holds up the next alarm.
pub fn spawn_alarm_pump(
    delivery: Arc<DeliveryHandler>,
    mut fired_rx: mpsc::UnboundedReceiver<AlarmFired>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(fired) = fired_rx.recv().await {
            let delivery = delivery.clone();
            tokio::spawn(async move {
                delivery
                    .on_alarm_fired(fired.task_id, &fired.description)
                    .await;
            });
        }
    })
}

pub fn spawn_response_pump(
    delivery: Arc<DeliveryHandler>,
    mut responses_rx: mpsc::UnboundedReceiver<NotificationResponse>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(response) = responses_rx.recv().await {
            let delivery = delivery.clone();
            tokio::spawn(async move {
                delivery.handle_response(response).await;
            });
        }
    })
}

pub async fn run(config: &Config) -> Result<()> {
    run_with_shutdown(config, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = config.token();
    if token.trim().is_empty() {
        return Err(ReminderError::Config(
            "daemon token is required (--token or TODO_REMINDERS_TOKEN)".to_string(),
        ));
    }

    let pool = db::open_pool(&config.database_path()).await?;
    let tasks: Arc<dyn TaskStore> = Arc::new(TodoStore::with_pool(pool.clone()));
    let settings: Arc<dyn SettingsStore> = Arc::new(PreferencesStore::with_pool(pool).await?);

    let (alarms, fired_rx) =
        TokioAlarmScheduler::new(config.exact_alarms_allowed(), config.inexact_slack());
    let alarms = Arc::new(alarms);
    let reminders = Arc::new(ReminderScheduler::new(alarms.clone()));

    let (presenter, responses_rx): (
        Arc<dyn NotificationPresenter>,
        Option<mpsc::UnboundedReceiver<NotificationResponse>>,
    ) = if config.desktop_notifications() {
        let (notifier, rx) = DesktopNotifier::new(&config.app_name());
        (Arc::new(notifier), Some(rx))
    } else {
        (Arc::new(LogNotifier::new()), None)
    };

    let (events, _) = broadcast::channel(256);
    let delivery = Arc::new(
        DeliveryHandler::new(tasks.clone(), settings.clone(), reminders.clone(), presenter)
            .with_events(events.clone()),
    );
    let boot = Arc::new(BootRecovery::new(
        tasks.clone(),
        settings.clone(),
        reminders.clone(),
    ));
    let monitor = Arc::new(SettingsMonitor::new(
        settings.clone(),
        tasks.clone(),
        reminders.clone(),
    ));
    let todos = Arc::new(TodoService::new(tasks, settings.clone(), reminders));

    // Alarms registered before this process started are gone.
    boot.on_boot_completed().await;

    let mut workers = vec![monitor.spawn(), spawn_alarm_pump(delivery.clone(), fired_rx)];
    if let Some(responses_rx) = responses_rx {
        workers.push(spawn_response_pump(delivery.clone(), responses_rx));
    }

    let state = AppState {
        todos,
        settings,
        delivery,
        boot,
        alarms: alarms.clone(),
        token,
        events,
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.host(), config.port());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ReminderError::Runtime(e.to_string()))?;
    info!(%addr, "todo reminders daemon listening");

    let shutdown = async move {
        shutdown.await;
        for worker in workers {
            worker.abort();
        }
        let dropped = alarms.clear().await;
        if dropped > 0 {
            warn!(dropped, "pending alarms dropped on shutdown");
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ReminderError::Runtime(e.to_string()))?;

    Ok(())
}
