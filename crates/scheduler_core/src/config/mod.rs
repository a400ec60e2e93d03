use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "task-scheduler";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASK_SCHEDULER_CONFIG_PATH";

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_MIN_DISPLAY_MS: u64 = 1_000;
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Task Scheduler";

#[derive(Debug, Clone)]
pub struct Palette {
    pub task: &'static str,
    pub selected: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn taskize(&self, text: &str) -> String {
        if self.task.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.task, text, self.reset)
        }
    }

    pub fn selectize(&self, text: &str) -> String {
        if self.selected.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.selected, text, self.reset)
        }
    }
}

/// Terminal colours for highlighted dates. `meadow` mirrors the light and
/// dark green calendar markers.
pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    match theme.and_then(canonical_theme_name).as_deref() {
        Some("meadow") => Palette {
            task: "\x1b[1;38;5;120m",
            selected: "\x1b[1;38;5;22m",
            reset: "\x1b[0m",
        },
        _ => Palette {
            task: "",
            selected: "",
            reset: "",
        },
    }
}

pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let trimmed = canonicalize_key(raw);
    if trimmed.is_empty() {
        return Some("plain".into());
    }

    match trimmed.as_str() {
        "none" | "default" | "mono" => Some("plain".to_string()),
        "green" | "color" | "colour" => Some("meadow".to_string()),
        _ => Some(trimmed),
    }
}

fn canonicalize_key(raw: &str) -> String {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    cleaned.trim_matches('_').to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: Option<PathBuf>,
    pub tick_interval_ms: u64,
    pub min_display_ms: u64,
    pub highlight_selected: bool,
    pub notification_title: String,
    pub theme: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            min_display_ms: DEFAULT_MIN_DISPLAY_MS,
            highlight_selected: true,
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            theme: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

/// A single `KEY=VALUE` override, already validated against its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverride {
    StorePath(PathBuf),
    TickIntervalMs(u64),
    MinDisplayMs(u64),
    HighlightSelected(bool),
    NotificationTitle(String),
    Theme(String),
}

pub fn config_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_input("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_input("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "falling back to default config");
            ConfigLoad {
                config: Config::default(),
                error: Some(err),
            }
        }
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::persistence(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|err| AppError::parse(format!("invalid JSON in {}: {}", path.display(), err)))?;
    validate(&config)?;
    Ok(normalize_config_theme(config))
}

fn validate(config: &Config) -> Result<(), AppError> {
    if config.tick_interval_ms == 0 {
        return Err(AppError::invalid_input("tick_interval_ms must be positive"));
    }
    Ok(())
}

fn normalize_config_theme(mut config: Config) -> Config {
    config.theme = config.theme.and_then(|name| canonical_theme_name(&name));
    config
}

/// Parse a raw `KEY=VALUE` override string.
pub fn parse_config_override(raw: &str) -> Result<ConfigOverride, AppError> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| AppError::invalid_input("override must be in KEY=VALUE format"))?;

    let key = canonicalize_key(key_raw);
    let value = value_raw.trim();
    if key.is_empty() {
        return Err(AppError::invalid_input("override key cannot be empty"));
    }

    let parse_ms = |value: &str| {
        value
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| AppError::invalid_input(format!("{key} must be a positive integer")))
    };

    match key.as_str() {
        "store_path" | "store" => Ok(ConfigOverride::StorePath(PathBuf::from(value))),
        "tick_interval_ms" | "tick_ms" => Ok(ConfigOverride::TickIntervalMs(parse_ms(value)?)),
        "min_display_ms" => Ok(ConfigOverride::MinDisplayMs(parse_ms(value)?)),
        "highlight_selected" => match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(ConfigOverride::HighlightSelected(true)),
            "false" | "no" | "0" | "off" => Ok(ConfigOverride::HighlightSelected(false)),
            _ => Err(AppError::invalid_input("highlight_selected must be a boolean")),
        },
        "notification_title" | "title" => Ok(ConfigOverride::NotificationTitle(value.to_string())),
        "theme" => Ok(ConfigOverride::Theme(value.to_string())),
        other => Err(AppError::invalid_input(format!("unknown config field '{other}'"))),
    }
}

pub fn merge_overrides(base: &Config, overrides: &[ConfigOverride]) -> Config {
    let mut merged = base.clone();
    for value in overrides {
        match value {
            ConfigOverride::StorePath(path) => merged.store_path = Some(path.clone()),
            ConfigOverride::TickIntervalMs(ms) => merged.tick_interval_ms = *ms,
            ConfigOverride::MinDisplayMs(ms) => merged.min_display_ms = *ms,
            ConfigOverride::HighlightSelected(flag) => merged.highlight_selected = *flag,
            ConfigOverride::NotificationTitle(title) => merged.notification_title = title.clone(),
            ConfigOverride::Theme(theme) => merged.theme = canonical_theme_name(theme),
        }
    }
    merged
}
