pub mod config;
pub mod error;
pub mod highlight;
pub mod model;
pub mod notify;
pub mod poller;
pub mod reminder;
pub mod session;
pub mod storage;
pub mod store;
pub mod task_api;
pub mod timefmt;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::Task;
    use crate::notify::NoopNotifier;
    use crate::poller::{PollerSettings, ReminderPoller};
    use crate::store::TaskStore;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::Duration;
    use time::macros::{date, datetime, time};

    #[test]
    fn task_has_required_fields() {
        let task = Task::new("demo", date!(2025 - 12 - 20), time!(8:00), None).unwrap();

        assert_eq!(task.name, "demo");
        assert_eq!(task.date(), date!(2025 - 12 - 20));
        assert_eq!(task.start, datetime!(2025-12-20 8:00));
        assert!(!task.reminder_enabled());
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::EmptyName;
        assert_eq!(err.code(), "empty_name");
    }

    #[test]
    fn standup_scenario_end_to_end() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("task-scheduler-{nanos}-scenario.json"));

        let mut store = TaskStore::empty(&path);
        store
            .add_task(
                date!(2024 - 01 - 10),
                "Standup",
                time!(9:00),
                Some(Duration::minutes(15)),
            )
            .unwrap();
        let reloaded = TaskStore::load(&path).unwrap();
        fs::remove_file(&path).ok();

        let settings = PollerSettings {
            title: "Task Scheduler".to_string(),
            min_display_ms: 1_000,
        };
        let mut early = ReminderPoller::new(Box::new(NoopNotifier), settings.clone());
        early.reload(&reloaded, datetime!(2024-01-10 8:00));
        assert!(early.tick(datetime!(2024-01-10 8:40)).delivered.is_empty());

        let mut due = ReminderPoller::new(Box::new(NoopNotifier), settings);
        due.reload(&reloaded, datetime!(2024-01-10 8:00));
        let outcome = due.tick(datetime!(2024-01-10 8:46));
        assert_eq!(outcome.delivered.len(), 1);
        assert_eq!(outcome.delivered[0].task_name, "Standup");
    }
}
