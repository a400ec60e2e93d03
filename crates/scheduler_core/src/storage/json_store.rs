use crate::config::{self, Config};
use crate::error::AppError;
use crate::model::{Task, normalize_name};
use crate::timefmt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::Date;

const STORE_FILE_NAME: &str = "tasks.json";
const STORE_ENV_VAR: &str = "TASK_SCHEDULER_STORE_PATH";

/// Tasks filed by date. Dates and each date's tasks keep insertion order.
pub type Days = IndexMap<Date, Vec<Task>>;

/// One task entry: `[start, reminder_enabled, reminder]`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Full(String, bool, Option<String>),
    Short(String, bool),
}

pub fn store_path(config: &Config) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = config.store_path.as_ref() {
        return Ok(path.clone());
    }

    Ok(config::config_dir()?.join(STORE_FILE_NAME))
}

pub fn load_days(path: &Path) -> Result<Days, AppError> {
    if !path.exists() {
        return Ok(Days::new());
    }

    let content = std::fs::read(path)
        .map_err(|err| AppError::persistence(format!("{}: {}", path.display(), err)))?;
    let document: Value = serde_json::from_slice(&content).map_err(|err| {
        AppError::parse(format!("invalid JSON in {}: {}", path.display(), err))
    })?;

    parse_document(document)
}

pub fn save_days(path: &Path, days: &Days) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|err| AppError::persistence(format!("{}: {}", parent.display(), err)))?;
    }

    let content = serde_json::to_string_pretty(&to_document(days)?)
        .map_err(|err| AppError::persistence(err.to_string()))?;
    std::fs::write(path, content)
        .map_err(|err| AppError::persistence(format!("{}: {}", path.display(), err)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|err| AppError::persistence(err.to_string()))?;
    }

    tracing::debug!(path = %path.display(), dates = days.len(), "saved task file");
    Ok(())
}

/// Modification time of the task file, if it exists.
pub fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn to_document(days: &Days) -> Result<Value, AppError> {
    let mut root = Map::new();
    for (date, tasks) in days {
        let mut entries = Map::new();
        for task in tasks {
            let entry = StoredEntry::Full(
                timefmt::format_datetime(task.start),
                task.reminder_enabled(),
                task.reminder.map(timefmt::format_datetime),
            );
            let value =
                serde_json::to_value(entry).map_err(|err| AppError::persistence(err.to_string()))?;
            entries.insert(task.name.clone(), value);
        }
        root.insert(timefmt::format_date(*date), Value::Object(entries));
    }
    Ok(Value::Object(root))
}

fn parse_document(document: Value) -> Result<Days, AppError> {
    let Value::Object(root) = document else {
        return Err(AppError::parse("task file must contain a JSON object"));
    };

    let mut days = Days::new();
    for (date_key, entries) in root {
        let date = timefmt::parse_date(&date_key)
            .map_err(|_| AppError::parse(format!("invalid date key '{date_key}'")))?;
        let Value::Object(entries) = entries else {
            return Err(AppError::parse(format!("tasks for {date_key} must be an object")));
        };

        if days.contains_key(&date) {
            return Err(AppError::parse(format!("date {date_key} appears more than once")));
        }

        let mut tasks: Vec<Task> = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            let task = parse_entry(date, &name, entry)?;
            if tasks.iter().any(|existing| existing.name == task.name) {
                return Err(AppError::parse(format!(
                    "duplicate task name '{}' on {date_key}",
                    task.name
                )));
            }
            tasks.push(task);
        }

        if !tasks.is_empty() {
            days.insert(date, tasks);
        }
    }

    Ok(days)
}

fn parse_entry(date: Date, name: &str, entry: Value) -> Result<Task, AppError> {
    let context = |message: &str| {
        AppError::parse(format!(
            "task '{}' on {}: {}",
            name,
            timefmt::format_date(date),
            message
        ))
    };

    let name = normalize_name(name).map_err(|_| context("name is blank"))?;
    let stored: StoredEntry = serde_json::from_value(entry)
        .map_err(|_| context("expected [start, reminder_enabled, reminder]"))?;
    let (start, enabled, reminder) = match stored {
        StoredEntry::Full(start, enabled, reminder) => (start, enabled, reminder),
        StoredEntry::Short(start, enabled) => (start, enabled, None),
    };

    let start = timefmt::parse_datetime(&start).map_err(|err| context(&err.to_string()))?;
    if start.date() != date {
        return Err(context("start falls on a different date"));
    }

    let reminder = if enabled {
        let raw = reminder.ok_or_else(|| context("reminder is enabled but has no time"))?;
        let reminder = timefmt::parse_datetime(&raw).map_err(|err| context(&err.to_string()))?;
        if reminder >= start {
            return Err(context("reminder must precede start"));
        }
        Some(reminder)
    } else {
        None
    };

    Ok(Task {
        name,
        start,
        reminder,
    })
}
