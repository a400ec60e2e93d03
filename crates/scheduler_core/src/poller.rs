//! Periodic reminder delivery.
//!
//! The poller owns the reminder index and a notifier. Each tick pops the
//! reminders that have come due and hands one notification per reminder to
//! the notifier. A failed delivery is reported and dropped; it is never
//! queued again.

use crate::config::Config;
use crate::error::AppError;
use crate::notify::{NotificationEvent, Notifier};
use crate::reminder::{DueReminder, ReminderIndex};
use crate::storage::json_store;
use crate::store::TaskStore;
use crate::timefmt;
use std::path::Path;
use std::time::SystemTime;
use time::PrimitiveDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerSettings {
    pub title: String,
    /// Floor for how long a notification stays up, in milliseconds. Applies
    /// once the task's start time is close or already past.
    pub min_display_ms: u64,
}

impl PollerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.notification_title.clone(),
            min_display_ms: config.min_display_ms,
        }
    }
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub event: NotificationEvent,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct TickOutcome {
    pub delivered: Vec<NotificationEvent>,
    pub failures: Vec<NotificationFailure>,
}

impl TickOutcome {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failures.is_empty()
    }
}

pub struct ReminderPoller {
    index: ReminderIndex,
    notifier: Box<dyn Notifier>,
    settings: PollerSettings,
}

impl ReminderPoller {
    pub fn new(notifier: Box<dyn Notifier>, settings: PollerSettings) -> Self {
        Self {
            index: ReminderIndex::new(),
            notifier,
            settings,
        }
    }

    /// Rebuilds the pending reminders after the store changed.
    pub fn reload(&mut self, store: &TaskStore, now: PrimitiveDateTime) {
        self.index.rebuild(store, now);
    }

    pub fn index(&self) -> &ReminderIndex {
        &self.index
    }

    pub fn tick(&mut self, now: PrimitiveDateTime) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for due in self.index.pop_due(now) {
            let event = notification_for(&due, now, &self.settings);
            match self.notifier.notify(&event) {
                Ok(()) => {
                    tracing::info!(date = %event.date, name = %event.task_name, "reminder delivered");
                    outcome.delivered.push(event);
                }
                Err(error) => {
                    tracing::warn!(
                        date = %event.date,
                        name = %event.task_name,
                        error = %error,
                        "reminder dropped"
                    );
                    outcome.failures.push(NotificationFailure { event, error });
                }
            }
        }

        outcome
    }
}

pub fn notification_for(
    due: &DueReminder,
    now: PrimitiveDateTime,
    settings: &PollerSettings,
) -> NotificationEvent {
    let task = &due.task;
    NotificationEvent {
        title: settings.title.clone(),
        body: format!(
            "{} starts at {}",
            task.name,
            timefmt::format_time(task.start.time())
        ),
        display_ms: display_ms(task.start, now, settings.min_display_ms),
        date: due.date,
        task_name: task.name.clone(),
        start: task.start,
    }
}

/// Milliseconds until `start`, never less than `floor_ms`.
pub fn display_ms(start: PrimitiveDateTime, now: PrimitiveDateTime, floor_ms: u64) -> u64 {
    let remaining = (start - now).whole_milliseconds();
    u64::try_from(remaining).unwrap_or(0).max(floor_ms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub interval: std::time::Duration,
    /// Stop after this many ticks; run until interrupted when `None`.
    pub max_ticks: Option<u64>,
}

impl WatchOptions {
    pub fn from_config(config: &Config, max_ticks: Option<u64>) -> Self {
        Self {
            interval: std::time::Duration::from_millis(config.tick_interval_ms),
            max_ticks,
        }
    }
}

/// Drives `poller` at a fixed interval against the task file at `path`.
///
/// The file is reloaded whenever its modification time changes, so edits made
/// by other commands are picked up without a restart. A reload only drops
/// reminders that were already past at the previous tick. A file that fails to
/// parse keeps the previously loaded reminders. Returns the number of ticks run.
pub fn watch_store<C, R>(
    path: &Path,
    poller: &mut ReminderPoller,
    options: WatchOptions,
    mut clock: C,
    mut report: R,
) -> u64
where
    C: FnMut() -> PrimitiveDateTime,
    R: FnMut(&TickOutcome),
{
    let mut last_modified: Option<SystemTime> = None;
    let mut last_tick: Option<PrimitiveDateTime> = None;
    let mut loaded = false;
    let mut ticks = 0u64;

    loop {
        let now = clock();
        let modified = json_store::modified_at(path);
        if !loaded || modified != last_modified {
            match TaskStore::load(path) {
                Ok(store) => {
                    // Reminders that came due after the previous tick have not
                    // fired yet and must survive the rebuild.
                    poller.reload(&store, last_tick.unwrap_or(now));
                    tracing::info!(pending = poller.index().len(), "watching reminders");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "keeping previous reminders");
                }
            }
            last_modified = modified;
            loaded = true;
        }

        let outcome = poller.tick(now);
        last_tick = Some(now);
        if !outcome.is_empty() {
            report(&outcome);
        }

        ticks += 1;
        if options.max_ticks.is_some_and(|max| ticks >= max) {
            return ticks;
        }

        std::thread::sleep(options.interval);
    }
}
