mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{eventually, open_stores, RecordingPresenter};
use todo_reminders::alarms::TokioAlarmScheduler;
use todo_reminders::clock::{minutes_from_now, now_millis, MILLIS_PER_MINUTE};
use todo_reminders::domains::{NewTask, NotificationPreferences, ReminderAction};
use todo_reminders::interfaces::stores::{SettingsStore, TaskStore};
use todo_reminders::services::{
    ActionOutcome, DeliveryHandler, ReminderScheduler, SettingsMonitor, TodoService,
    SNOOZE_MINUTES,
};

#[tokio::test]
async fn reminder_lifecycle_across_settings_and_snooze() {
    let stores = open_stores().await;
    let (alarms, _fired) = TokioAlarmScheduler::new(true, Duration::ZERO);
    let alarms = Arc::new(alarms);
    let reminders = Arc::new(ReminderScheduler::new(alarms.clone()));
    let presenter = Arc::new(RecordingPresenter::new());
    let todos = TodoService::new(
        stores.tasks.clone(),
        stores.settings.clone(),
        reminders.clone(),
    );
    let delivery = DeliveryHandler::new(
        stores.tasks.clone(),
        stores.settings.clone(),
        reminders.clone(),
        presenter.clone(),
    );
    let monitor = Arc::new(SettingsMonitor::new(
        stores.settings.clone(),
        stores.tasks.clone(),
        reminders.clone(),
    ))
    .spawn();

    let at = minutes_from_now(5);
    let task = todos
        .create(
            Some(1),
            NewTask {
                list_id: 1,
                description: "Task A".to_string(),
                reminder_at: Some(at),
            },
        )
        .await
        .unwrap();
    assert_eq!(alarms.pending_for(task.id).await.unwrap().fire_at, at);

    stores
        .settings
        .update(NotificationPreferences {
            reminder_enabled: false,
            ..NotificationPreferences::default()
        })
        .await
        .unwrap();
    assert!(
        eventually(|| {
            let alarms = alarms.clone();
            async move { alarms.pending_for(task.id).await.is_none() }
        })
        .await
    );

    stores
        .settings
        .update(NotificationPreferences::default())
        .await
        .unwrap();
    assert!(
        eventually(|| {
            let alarms = alarms.clone();
            async move { alarms.pending_for(task.id).await.map(|alarm| alarm.fire_at) == Some(at) }
        })
        .await
    );

    delivery.on_alarm_fired(task.id, &task.description).await;
    assert_eq!(presenter.shown().len(), 1);
    assert_eq!(presenter.shown()[0].body, "Task A");

    let before = now_millis();
    let outcome = delivery
        .on_notification_action(ReminderAction::Snooze, task.id)
        .await;
    let ActionOutcome::Snoozed(snoozed) = outcome else {
        panic!("expected snooze, got {outcome:?}");
    };
    let snoozed_at = snoozed.reminder_at.unwrap();
    assert!(snoozed_at >= before + SNOOZE_MINUTES * MILLIS_PER_MINUTE);

    let pending = alarms.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].key, task.id);
    assert_eq!(pending[0].fire_at, snoozed_at);
    assert_eq!(presenter.dismissed(), vec![task.id]);
    assert_eq!(
        stores.tasks.get_by_id(task.id).await.unwrap().unwrap().reminder_at,
        Some(snoozed_at)
    );

    monitor.abort();
}

#[tokio::test]
async fn fired_timer_reaches_the_presenter() {
    let stores = open_stores().await;
    let (alarms, mut fired) = TokioAlarmScheduler::new(true, Duration::ZERO);
    let alarms = Arc::new(alarms);
    let reminders = Arc::new(ReminderScheduler::new(alarms.clone()));
    let presenter = Arc::new(RecordingPresenter::new());
    let todos = TodoService::new(
        stores.tasks.clone(),
        stores.settings.clone(),
        reminders.clone(),
    );
    let delivery = DeliveryHandler::new(
        stores.tasks.clone(),
        stores.settings.clone(),
        reminders,
        presenter.clone(),
    );

    let task = todos
        .create(
            Some(1),
            NewTask {
                list_id: 1,
                description: "soon".to_string(),
                reminder_at: Some(now_millis() + 300),
            },
        )
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), fired.recv())
        .await
        .unwrap()
        .unwrap();
    delivery.on_alarm_fired(event.task_id, &event.description).await;

    let shown = presenter.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].id, task.id);
    assert_eq!(shown[0].body, "soon");

    delivery
        .on_notification_action(ReminderAction::Complete, task.id)
        .await;
    assert!(alarms.pending().await.is_empty());
    assert!(todos.get(task.id).await.unwrap().is_completed);
}

#[tokio::test]
async fn service_respects_preferences_and_user_policy() {
    let stores = open_stores().await;
    let (alarms, _fired) = TokioAlarmScheduler::new(true, Duration::ZERO);
    let alarms = Arc::new(alarms);
    let todos = TodoService::new(
        stores.tasks.clone(),
        stores.settings.clone(),
        Arc::new(ReminderScheduler::new(alarms.clone())),
    );
    let new = || NewTask {
        list_id: 1,
        description: "gated".to_string(),
        reminder_at: Some(minutes_from_now(5)),
    };

    assert!(todos.create(None, new()).await.is_err());

    stores
        .settings
        .update(NotificationPreferences {
            enabled: false,
            ..NotificationPreferences::default()
        })
        .await
        .unwrap();
    let task = todos.create(Some(1), new()).await.unwrap();
    assert!(alarms.pending_for(task.id).await.is_none());

    stores
        .settings
        .update(NotificationPreferences::default())
        .await
        .unwrap();
    todos
        .set_reminder(task.id, Some(minutes_from_now(20)))
        .await
        .unwrap();
    assert!(alarms.pending_for(task.id).await.is_some());

    todos.complete(task.id).await.unwrap();
    assert!(alarms.pending_for(task.id).await.is_none());
    todos.reopen(task.id).await.unwrap();
    assert!(alarms.pending_for(task.id).await.is_some());

    todos.update_description(task.id, "renamed").await.unwrap();
    assert_eq!(
        alarms.pending_for(task.id).await.unwrap().payload.description,
        "renamed"
    );

    assert!(todos.delete(task.id).await.unwrap());
    assert!(alarms.pending_for(task.id).await.is_none());
    assert!(todos.get(task.id).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_register_one_alarm_per_task() {
    let stores = open_stores().await;
    let (alarms, _fired) = TokioAlarmScheduler::new(true, Duration::ZERO);
    let alarms = Arc::new(alarms);
    let reminders = Arc::new(ReminderScheduler::new(alarms.clone()));
    let todos = Arc::new(TodoService::new(
        stores.tasks.clone(),
        stores.settings.clone(),
        reminders.clone(),
    ));
    let monitor = Arc::new(SettingsMonitor::new(
        stores.settings.clone(),
        stores.tasks.clone(),
        reminders,
    ))
    .spawn();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let todos = todos.clone();
            tokio::spawn(async move {
                todos
                    .create(
                        Some(1),
                        NewTask {
                            list_id: 1,
                            description: format!("task {i}"),
                            reminder_at: Some(minutes_from_now(10 + i)),
                        },
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();
    let mut created = Vec::new();
    for handle in handles {
        created.push(handle.await.unwrap());
    }

    assert_eq!(alarms.pending().await.len(), created.len());
    for task in &created {
        let alarm = alarms.pending_for(task.id).await.unwrap();
        assert_eq!(Some(alarm.fire_at), task.reminder_at);
        assert_eq!(alarm.payload.task_id, task.id);
        assert_eq!(alarm.payload.description, task.description);
    }

    monitor.abort();
}
