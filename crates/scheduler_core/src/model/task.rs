use crate::error::AppError;
use time::{Date, Duration, PrimitiveDateTime, Time};

/// A named task on a calendar date.
///
/// The date is carried by `start`; the store files tasks under that date and
/// rejects a task whose start falls on another day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub start: PrimitiveDateTime,
    pub reminder: Option<PrimitiveDateTime>,
}

impl Task {
    /// Builds a task, deriving the reminder as `start - lead`.
    pub fn new(
        name: &str,
        date: Date,
        start_time: Time,
        reminder_lead: Option<Duration>,
    ) -> Result<Self, AppError> {
        let name = normalize_name(name)?;
        let start = PrimitiveDateTime::new(date, start_time);
        let reminder = match reminder_lead {
            Some(lead) => Some(reminder_at(start, lead)?),
            None => None,
        };

        Ok(Self {
            name,
            start,
            reminder,
        })
    }

    pub fn date(&self) -> Date {
        self.start.date()
    }

    pub fn reminder_enabled(&self) -> bool {
        self.reminder.is_some()
    }

    pub fn reminder_lead(&self) -> Option<Duration> {
        self.reminder.map(|reminder| self.start - reminder)
    }
}

/// Trims a task name, rejecting blank ones.
pub fn normalize_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn reminder_at(start: PrimitiveDateTime, lead: Duration) -> Result<PrimitiveDateTime, AppError> {
    if !lead.is_positive() {
        return Err(AppError::invalid_input("reminder lead time must be positive"));
    }
    start
        .checked_sub(lead)
        .ok_or_else(|| AppError::invalid_input("reminder lead time is out of range"))
}
