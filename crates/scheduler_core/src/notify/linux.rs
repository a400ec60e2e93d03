use crate::error::AppError;
use crate::notify::{NotificationEvent, Notifier};
use notify_rust::{Notification, Timeout};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, event: &NotificationEvent) -> Result<(), AppError> {
        let timeout = u32::try_from(event.display_ms).unwrap_or(u32::MAX);

        Notification::new()
            .summary(&event.title)
            .body(&event.body)
            .icon("dialog-information")
            .timeout(Timeout::Milliseconds(timeout))
            .show()
            .map_err(|err| AppError::notification(err.to_string()))?;

        Ok(())
    }
}
