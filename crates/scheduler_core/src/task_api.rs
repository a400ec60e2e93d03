use crate::config::Config;
use crate::error::AppError;
use crate::highlight::{HighlightStyle, Marker, date_markers};
use crate::model::Task;
use crate::session::{EditSession, TaskForm};
use crate::storage::json_store;
use crate::store::{Deleted, StoreLoad, TaskStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::{Date, Duration, Time};

/// Everything a front-end shows after a date is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateView {
    pub date: Date,
    pub tasks: Vec<Task>,
    pub markers: BTreeMap<Date, Marker>,
    /// Set when the task file could not be read and an empty store was shown.
    pub load_error: Option<AppError>,
}

/// How an edit treats the reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReminderChange {
    #[default]
    Keep,
    Disable,
    Lead(Duration),
}

/// Fields to change on an existing task; unset fields keep their value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskPatch {
    pub rename: Option<String>,
    pub start_time: Option<Time>,
    pub reminder: ReminderChange,
}

/// Stores holding an accepted change that could not be written.
///
/// The next operation on the same path continues from the held store
/// instead of the file, and [`PendingWrites::retry`] writes it again.
#[derive(Debug, Default)]
pub struct PendingWrites {
    stores: BTreeMap<PathBuf, TaskStore>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Writes every held store again. Stores that still fail stay held and
    /// the first failure is returned.
    pub fn retry(&mut self) -> Result<(), AppError> {
        let mut first_error = None;
        self.stores.retain(|path, store| match store.flush() {
            Ok(()) => {
                tracing::info!(path = %path.display(), "saved pending changes");
                false
            }
            Err(err) => {
                first_error.get_or_insert(err);
                true
            }
        });
        first_error.map_or(Ok(()), Err)
    }

    fn open(&mut self, path: &Path) -> Result<TaskStore, AppError> {
        match self.stores.remove(path) {
            Some(store) => Ok(store),
            None => TaskStore::load(path),
        }
    }

    fn view(&self, path: &Path) -> StoreLoad {
        match self.stores.get(path) {
            Some(store) => StoreLoad {
                store: store.clone(),
                error: None,
            },
            None => TaskStore::open_with_fallback(path),
        }
    }

    fn settle<T>(&mut self, store: TaskStore, result: Result<T, AppError>) -> Result<T, AppError> {
        if store.is_dirty() {
            self.stores.insert(store.path().to_path_buf(), store);
        }
        result
    }
}

pub fn add_task(
    pending: &mut PendingWrites,
    config: &Config,
    date: Date,
    name: &str,
    start_time: Time,
    reminder_lead: Option<Duration>,
) -> Result<Task, AppError> {
    let path = json_store::store_path(config)?;
    add_task_with_path(pending, &path, date, name, start_time, reminder_lead)
}

pub fn edit_task(
    pending: &mut PendingWrites,
    config: &Config,
    date: Date,
    name: &str,
    patch: &TaskPatch,
) -> Result<Task, AppError> {
    let path = json_store::store_path(config)?;
    edit_task_with_path(pending, &path, date, name, patch)
}

pub fn delete_task(
    pending: &mut PendingWrites,
    config: &Config,
    date: Date,
    name: &str,
) -> Result<Deleted, AppError> {
    let path = json_store::store_path(config)?;
    delete_task_with_path(pending, &path, date, name)
}

pub fn select_date(
    pending: &PendingWrites,
    config: &Config,
    date: Date,
) -> Result<DateView, AppError> {
    let path = json_store::store_path(config)?;
    Ok(select_date_with_path(
        pending,
        &path,
        date,
        HighlightStyle::from_flag(config.highlight_selected),
    ))
}

fn add_task_with_path(
    pending: &mut PendingWrites,
    path: &Path,
    date: Date,
    name: &str,
    start_time: Time,
    reminder_lead: Option<Duration>,
) -> Result<Task, AppError> {
    let mut store = pending.open(path)?;
    let form = TaskForm {
        name: name.to_string(),
        start_time,
        reminder_lead,
    };
    let result = EditSession::new(date).submit(&mut store, &form);
    pending.settle(store, result)
}

fn edit_task_with_path(
    pending: &mut PendingWrites,
    path: &Path,
    date: Date,
    name: &str,
    patch: &TaskPatch,
) -> Result<Task, AppError> {
    let mut store = pending.open(path)?;
    let result = apply_patch(&mut store, date, name, patch);
    pending.settle(store, result)
}

fn apply_patch(
    store: &mut TaskStore,
    date: Date,
    name: &str,
    patch: &TaskPatch,
) -> Result<Task, AppError> {
    let session = EditSession::editing(date, name);
    let mut form = session
        .initial_form(store)?
        .ok_or_else(|| AppError::not_found(date, name))?;

    if let Some(rename) = patch.rename.as_ref() {
        form.name = rename.clone();
    }
    if let Some(start_time) = patch.start_time {
        form.start_time = start_time;
    }
    match patch.reminder {
        ReminderChange::Keep => {}
        ReminderChange::Disable => form.reminder_lead = None,
        ReminderChange::Lead(lead) => form.reminder_lead = Some(lead),
    }

    session.submit(store, &form)
}

fn delete_task_with_path(
    pending: &mut PendingWrites,
    path: &Path,
    date: Date,
    name: &str,
) -> Result<Deleted, AppError> {
    let mut store = pending.open(path)?;
    let result = store.delete_task(date, name);
    pending.settle(store, result)
}

fn select_date_with_path(
    pending: &PendingWrites,
    path: &Path,
    date: Date,
    style: HighlightStyle,
) -> DateView {
    let loaded = pending.view(path);
    DateView {
        date,
        tasks: loaded.store.tasks_for(date),
        markers: date_markers(&loaded.store, Some(date), style),
        load_error: loaded.error,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        PendingWrites, ReminderChange, TaskPatch, add_task_with_path, delete_task_with_path,
        edit_task_with_path, select_date_with_path,
    };
    use crate::highlight::{HighlightStyle, Marker};
    use crate::store::TaskStore;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::Duration;
    use time::macros::{date, datetime, time};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("task-scheduler-{nanos}-{file_name}"))
    }

    #[test]
    fn add_task_persists_across_calls() {
        let mut pending = PendingWrites::new();
        let path = temp_path("api-add.json");

        add_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Standup",
            time!(9:00),
            Some(Duration::minutes(15)),
        )
        .unwrap();
        let err = add_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Standup",
            time!(10:00),
            None,
        )
        .unwrap_err();
        let reloaded = TaskStore::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "duplicate_task");
        let task = reloaded.get_task(date!(2024 - 01 - 10), "Standup").unwrap();
        assert_eq!(task.start, datetime!(2024-01-10 9:00));
    }

    #[test]
    fn edit_task_applies_only_patched_fields() {
        let mut pending = PendingWrites::new();
        let path = temp_path("api-edit.json");
        add_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Standup",
            time!(9:00),
            Some(Duration::minutes(15)),
        )
        .unwrap();

        let moved = edit_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Standup",
            &TaskPatch {
                start_time: Some(time!(9:30)),
                ..TaskPatch::default()
            },
        )
        .unwrap();
        let silenced = edit_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Standup",
            &TaskPatch {
                rename: Some("Sync".to_string()),
                reminder: ReminderChange::Disable,
                ..TaskPatch::default()
            },
        )
        .unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(moved.reminder, Some(datetime!(2024-01-10 9:15)));
        assert_eq!(silenced.name, "Sync");
        assert_eq!(silenced.start, datetime!(2024-01-10 9:30));
        assert_eq!(silenced.reminder, None);
    }

    #[test]
    fn edit_missing_task_reports_not_found() {
        let mut pending = PendingWrites::new();
        let path = temp_path("api-edit-missing.json");

        let err = edit_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Ghost",
            &TaskPatch::default(),
        )
        .unwrap_err();

        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn mutations_refuse_corrupt_file() {
        let mut pending = PendingWrites::new();
        let path = temp_path("api-corrupt.json");
        fs::write(&path, "garbage").unwrap();

        let err = add_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Standup",
            time!(9:00),
            None,
        )
        .unwrap_err();
        let untouched = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "parse_failure");
        assert_eq!(untouched, "garbage");
    }

    #[test]
    fn select_date_returns_sorted_tasks_and_markers() {
        let mut pending = PendingWrites::new();
        let path = temp_path("api-select.json");
        let day = date!(2024 - 01 - 10);
        add_task_with_path(&mut pending, &path, day, "Lunch", time!(12:00), None).unwrap();
        add_task_with_path(&mut pending, &path, day, "Standup", time!(9:00), None).unwrap();
        let next = date!(2024 - 01 - 11);
        add_task_with_path(&mut pending, &path, next, "Review", time!(9:00), None).unwrap();

        let view = select_date_with_path(
            &pending,
            &path,
            date!(2024 - 01 - 10),
            HighlightStyle::DistinguishSelected,
        );
        delete_task_with_path(&mut pending, &path, date!(2024 - 01 - 11), "Review").unwrap();
        let after_delete = select_date_with_path(
            &pending,
            &path,
            date!(2024 - 01 - 10),
            HighlightStyle::DistinguishSelected,
        );
        fs::remove_file(&path).ok();

        let names: Vec<_> = view.tasks.iter().map(|task| task.name.as_str()).collect();
        assert_eq!(names, ["Standup", "Lunch"]);
        assert_eq!(view.markers[&date!(2024 - 01 - 10)], Marker::Selected);
        assert_eq!(view.markers[&date!(2024 - 01 - 11)], Marker::Task);
        assert!(view.load_error.is_none());
        assert!(!after_delete.markers.contains_key(&date!(2024 - 01 - 11)));
    }

    #[test]
    fn select_date_reports_corrupt_file() {
        let pending = PendingWrites::new();
        let path = temp_path("api-select-corrupt.json");
        fs::write(&path, "{").unwrap();

        let view = select_date_with_path(
            &pending,
            &path,
            date!(2024 - 01 - 10),
            HighlightStyle::Uniform,
        );
        fs::remove_file(&path).ok();

        assert!(view.tasks.is_empty());
        assert_eq!(view.load_error.unwrap().code(), "parse_failure");
    }

    #[test]
    fn failed_write_is_held_and_retried() {
        let mut pending = PendingWrites::new();
        let dir = temp_path("api-blocked");
        fs::write(&dir, "not a directory").unwrap();
        let path = dir.join("tasks.json");

        let err = add_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Standup",
            time!(9:00),
            None,
        )
        .unwrap_err();
        assert_eq!(err.code(), "persistence_failure");
        assert!(!pending.is_empty());

        let view = select_date_with_path(
            &pending,
            &path,
            date!(2024 - 01 - 10),
            HighlightStyle::Uniform,
        );
        assert_eq!(view.tasks.len(), 1);
        assert!(view.load_error.is_none());

        let second = add_task_with_path(
            &mut pending,
            &path,
            date!(2024 - 01 - 10),
            "Lunch",
            time!(12:00),
            None,
        )
        .unwrap_err();
        assert_eq!(second.code(), "persistence_failure");
        assert_eq!(pending.retry().unwrap_err().code(), "persistence_failure");

        fs::remove_file(&dir).ok();
        pending.retry().unwrap();
        let reloaded = TaskStore::load(&path).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert!(pending.is_empty());
        let names: Vec<_> = reloaded
            .tasks_for(date!(2024 - 01 - 10))
            .into_iter()
            .map(|task| task.name)
            .collect();
        assert_eq!(names, ["Standup", "Lunch"]);
    }
}
