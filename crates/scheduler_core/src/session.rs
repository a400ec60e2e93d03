//! Editing context for a single add or edit interaction.
//!
//! A front-end opens a session for the date (and task) being worked on and
//! submits a form against it, instead of keeping "current date" and "current
//! task" in shared mutable state.

use crate::error::AppError;
use crate::model::Task;
use crate::store::TaskStore;
use time::{Date, Duration, Time};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    date: Date,
    editing: Option<String>,
}

/// Field values of the add/edit form. Reminder fields only exist when the
/// reminder is switched on, so the lead time is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub name: String,
    pub start_time: Time,
    pub reminder_lead: Option<Duration>,
}

impl TaskForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            start_time: task.start.time(),
            reminder_lead: task.reminder_lead(),
        }
    }
}

impl EditSession {
    pub fn new(date: Date) -> Self {
        Self {
            date,
            editing: None,
        }
    }

    pub fn editing(date: Date, name: &str) -> Self {
        Self {
            date,
            editing: Some(name.trim().to_string()),
        }
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn editing_name(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Pre-filled form for the task under edit, or `None` when adding.
    pub fn initial_form(&self, store: &TaskStore) -> Result<Option<TaskForm>, AppError> {
        match self.editing.as_deref() {
            Some(name) => store
                .get_task(self.date, name)
                .map(|task| Some(TaskForm::from_task(task)))
                .ok_or_else(|| AppError::not_found(self.date, name)),
            None => Ok(None),
        }
    }

    pub fn submit(&self, store: &mut TaskStore, form: &TaskForm) -> Result<Task, AppError> {
        match self.editing.as_deref() {
            Some(old_name) => store.edit_task(
                self.date,
                old_name,
                &form.name,
                form.start_time,
                form.reminder_lead,
            ),
            None => store.add_task(self.date, &form.name, form.start_time, form.reminder_lead),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EditSession, TaskForm};
    use crate::store::TaskStore;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::Duration;
    use time::macros::{date, time};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("task-scheduler-{nanos}-{file_name}"))
    }

    #[test]
    fn add_then_edit_through_sessions() {
        let path = temp_path("session.json");
        let mut store = TaskStore::empty(&path);

        let form = TaskForm {
            name: "Standup".to_string(),
            start_time: time!(9:00),
            reminder_lead: Some(Duration::minutes(15)),
        };
        EditSession::new(date!(2024 - 01 - 10))
            .submit(&mut store, &form)
            .unwrap();

        let session = EditSession::editing(date!(2024 - 01 - 10), "Standup");
        let mut form = session.initial_form(&store).unwrap().unwrap();
        assert_eq!(form.reminder_lead, Some(Duration::minutes(15)));

        form.name = "Daily standup".to_string();
        form.reminder_lead = None;
        let updated = session.submit(&mut store, &form).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(updated.name, "Daily standup");
        assert!(!updated.reminder_enabled());
        assert_eq!(store.tasks_for(date!(2024 - 01 - 10)).len(), 1);
    }

    #[test]
    fn adding_session_has_no_initial_form() {
        let path = temp_path("session-new.json");
        let store = TaskStore::empty(&path);

        let session = EditSession::new(date!(2024 - 01 - 10));
        assert!(session.initial_form(&store).unwrap().is_none());
        assert_eq!(session.editing_name(), None);
    }

    #[test]
    fn editing_missing_task_reports_not_found() {
        let path = temp_path("session-missing.json");
        let store = TaskStore::empty(&path);

        let err = EditSession::editing(date!(2024 - 01 - 10), "Ghost")
            .initial_form(&store)
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
