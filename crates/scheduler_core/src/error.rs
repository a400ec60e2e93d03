use thiserror::Error;
use time::Date;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("task name is required")]
    EmptyName,
    #[error("task '{name}' already exists on {date}")]
    DuplicateTask { date: Date, name: String },
    #[error("task '{name}' not found on {date}")]
    NotFound { date: Date, name: String },
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Persistence(String),
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Notification(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn persistence<M: Into<String>>(message: M) -> Self {
        Self::Persistence(message.into())
    }

    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::Parse(message.into())
    }

    pub fn notification<M: Into<String>>(message: M) -> Self {
        Self::Notification(message.into())
    }

    pub fn duplicate(date: Date, name: &str) -> Self {
        Self::DuplicateTask {
            date,
            name: name.to_string(),
        }
    }

    pub fn not_found(date: Date, name: &str) -> Self {
        Self::NotFound {
            date,
            name: name.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::DuplicateTask { .. } => "duplicate_task",
            Self::NotFound { .. } => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Persistence(_) => "persistence_failure",
            Self::Parse(_) => "parse_failure",
            Self::Notification(_) => "notification_failure",
        }
    }

    /// Validation errors leave the store untouched and can be corrected by the
    /// user; a persistence failure can be retried with [`crate::store::TaskStore::flush`].
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Parse(_))
    }

    /// Message suitable for `ERROR: <code> - <message>` reporting.
    pub fn report(&self) -> String {
        format!("{} - {}", self.code(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use time::macros::date;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::EmptyName.code(), "empty_name");
        assert_eq!(
            AppError::duplicate(date!(2024 - 01 - 10), "Standup").code(),
            "duplicate_task"
        );
        assert_eq!(AppError::persistence("disk full").code(), "persistence_failure");
        assert_eq!(AppError::parse("bad json").code(), "parse_failure");
    }

    #[test]
    fn report_includes_date_and_name() {
        let err = AppError::not_found(date!(2024 - 01 - 10), "Standup");
        assert_eq!(
            err.report(),
            "not_found - task 'Standup' not found on 2024-01-10"
        );
    }

    #[test]
    fn parse_failure_is_not_recoverable() {
        assert!(!AppError::parse("bad").is_recoverable());
        assert!(AppError::EmptyName.is_recoverable());
        assert!(AppError::persistence("disk").is_recoverable());
    }
}
