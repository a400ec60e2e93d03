//! In-memory task store backed by the JSON task file.
//!
//! Every mutating operation validates first, so a rejected call leaves the
//! store untouched. Accepted changes are written through to disk immediately
//! with a full-file overwrite. If that write fails the change stays in memory,
//! the store is marked dirty and [`TaskStore::flush`] can retry it.

use crate::error::AppError;
use crate::model::{Task, normalize_name};
use crate::storage::json_store::{self, Days};
use std::path::{Path, PathBuf};
use time::{Date, Duration, Time};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStore {
    path: PathBuf,
    days: Days,
    dirty: bool,
}

/// Result of opening a store that may have been corrupt on disk.
#[derive(Debug)]
pub struct StoreLoad {
    pub store: TaskStore,
    pub error: Option<AppError>,
}

/// A removed task and whether its date no longer has any tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub task: Task,
    pub date_cleared: bool,
}

impl TaskStore {
    /// An empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            days: Days::new(),
            dirty: false,
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let days = json_store::load_days(&path)?;
        tracing::info!(path = %path.display(), dates = days.len(), "loaded tasks");
        Ok(Self {
            path,
            days,
            dirty: false,
        })
    }

    /// Loads the store, falling back to an empty one when the file cannot be
    /// parsed. The file itself is left as it is until the next save.
    pub fn open_with_fallback(path: impl Into<PathBuf>) -> StoreLoad {
        let path = path.into();
        match Self::load(path.clone()) {
            Ok(store) => StoreLoad { store, error: None },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "starting with an empty task store");
                StoreLoad {
                    store: Self::empty(path),
                    error: Some(err),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn save(&self) -> Result<(), AppError> {
        json_store::save_days(&self.path, &self.days)
    }

    /// Retries a write that failed after an accepted change.
    pub fn flush(&mut self) -> Result<(), AppError> {
        if self.dirty {
            self.save()?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn add_task(
        &mut self,
        date: Date,
        name: &str,
        start_time: Time,
        reminder_lead: Option<Duration>,
    ) -> Result<Task, AppError> {
        let task = Task::new(name, date, start_time, reminder_lead)?;
        if self.get_task(date, &task.name).is_some() {
            return Err(AppError::duplicate(date, &task.name));
        }

        self.days.entry(date).or_default().push(task.clone());
        tracing::info!(date = %date, name = %task.name, "added task");
        self.persist()?;
        Ok(task)
    }

    pub fn edit_task(
        &mut self,
        date: Date,
        old_name: &str,
        new_name: &str,
        start_time: Time,
        reminder_lead: Option<Duration>,
    ) -> Result<Task, AppError> {
        let updated = Task::new(new_name, date, start_time, reminder_lead)?;
        let old_name = old_name.trim();
        let index = self
            .position(date, old_name)
            .ok_or_else(|| AppError::not_found(date, old_name))?;
        if updated.name != old_name && self.get_task(date, &updated.name).is_some() {
            return Err(AppError::duplicate(date, &updated.name));
        }

        let tasks = self
            .days
            .get_mut(&date)
            .ok_or_else(|| AppError::not_found(date, old_name))?;
        if updated.name == old_name {
            tasks[index] = updated.clone();
        } else {
            // A renamed task is filed again at the end of its date.
            tasks.remove(index);
            tasks.push(updated.clone());
        }
        tracing::info!(date = %date, from = %old_name, to = %updated.name, "edited task");
        self.persist()?;
        Ok(updated)
    }

    pub fn delete_task(&mut self, date: Date, name: &str) -> Result<Deleted, AppError> {
        let name = name.trim();
        let index = self
            .position(date, name)
            .ok_or_else(|| AppError::not_found(date, name))?;

        let tasks = self
            .days
            .get_mut(&date)
            .ok_or_else(|| AppError::not_found(date, name))?;
        let task = tasks.remove(index);
        let date_cleared = tasks.is_empty();
        if date_cleared {
            self.days.shift_remove(&date);
        }

        tracing::info!(date = %date, name = %task.name, date_cleared, "deleted task");
        self.persist()?;
        Ok(Deleted { task, date_cleared })
    }

    /// Tasks on `date` ordered by start time. Tasks starting at the same time
    /// keep the order they were added in.
    pub fn tasks_for(&self, date: Date) -> Vec<Task> {
        let mut tasks = self.days.get(&date).cloned().unwrap_or_default();
        tasks.sort_by_key(|task| task.start);
        tasks
    }

    pub fn get_task(&self, date: Date, name: &str) -> Option<&Task> {
        let index = self.position(date, name)?;
        self.days.get(&date).map(|tasks| &tasks[index])
    }

    /// Dates that have at least one task, in calendar order.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        let mut dates: Vec<Date> = self.days.keys().copied().collect();
        dates.sort_unstable();
        dates.into_iter()
    }

    /// Every task in the store, date by date.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.days.values().flatten()
    }

    fn position(&self, date: Date, name: &str) -> Option<usize> {
        let name = normalize_name(name).ok()?;
        self.days
            .get(&date)?
            .iter()
            .position(|task| task.name == name)
    }

    fn persist(&mut self) -> Result<(), AppError> {
        match self.save() {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "change kept in memory only");
                self.dirty = true;
                Err(err)
            }
        }
    }
}
