use crate::error::AppError;
use crate::notify::{NotificationEvent, Notifier};
use tauri_winrt_notification::{Duration, Toast};

/// Toasts only come in two lengths; anything past the short one asks for long.
const SHORT_TOAST_MS: u64 = 7_000;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, event: &NotificationEvent) -> Result<(), AppError> {
        let duration = if event.display_ms > SHORT_TOAST_MS {
            Duration::Long
        } else {
            Duration::Short
        };

        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(&event.title)
            .text1(&event.body)
            .duration(duration)
            .show()
            .map_err(|err| AppError::notification(err.to_string()))?;
        Ok(())
    }
}
