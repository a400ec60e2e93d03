use crate::error::AppError;
use time::{Date, PrimitiveDateTime};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const DISABLE_ENV_VAR: &str = "TASK_SCHEDULER_DISABLE_NOTIFICATIONS";

/// A reminder ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub title: String,
    pub body: String,
    pub display_ms: u64,
    pub date: Date,
    pub task_name: String,
    pub start: PrimitiveDateTime,
}

/// Fire-and-forget delivery of reminder notifications.
pub trait Notifier {
    fn notify(&self, event: &NotificationEvent) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &NotificationEvent) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Box<dyn Notifier> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Box::new(NoopNotifier);
    }

    match platform_notifier() {
        Ok(notifier) => notifier,
        Err(err) => {
            tracing::warn!(error = %err, "desktop notifications unavailable");
            Box::new(NoopNotifier)
        }
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::notification(
        "notifications are not supported on this platform",
    ))
}
