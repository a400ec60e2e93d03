use crate::model::Task;
use crate::store::TaskStore;
use std::collections::BTreeMap;
use time::{Date, PrimitiveDateTime};

/// Index key. Carrying the date and name keeps two tasks with the same
/// reminder time from overwriting each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ReminderKey {
    at: PrimitiveDateTime,
    date: Date,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub at: PrimitiveDateTime,
    pub date: Date,
    pub task: Task,
}

/// Pending reminders ordered by the time they fire.
#[derive(Debug, Default, Clone)]
pub struct ReminderIndex {
    entries: BTreeMap<ReminderKey, Task>,
}

impl ReminderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: &TaskStore, now: PrimitiveDateTime) -> Self {
        let mut index = Self::new();
        index.rebuild(store, now);
        index
    }

    /// Repopulates the index with every enabled reminder still ahead of `now`.
    /// Reminders already in the past are dropped, never fired late.
    pub fn rebuild(&mut self, store: &TaskStore, now: PrimitiveDateTime) {
        self.entries.clear();
        let mut skipped = 0usize;

        for task in store.iter() {
            let Some(at) = task.reminder else {
                continue;
            };
            if at <= now {
                skipped += 1;
                continue;
            }
            let key = ReminderKey {
                at,
                date: task.date(),
                name: task.name.clone(),
            };
            self.entries.insert(key, task.clone());
        }

        tracing::debug!(pending = self.entries.len(), skipped, "rebuilt reminder index");
    }

    /// Removes and returns every reminder due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: PrimitiveDateTime) -> Vec<DueReminder> {
        let due: Vec<ReminderKey> = self
            .entries
            .keys()
            .take_while(|key| key.at <= now)
            .cloned()
            .collect();

        due.into_iter()
            .filter_map(|key| {
                self.entries.remove_entry(&key).map(|(key, task)| DueReminder {
                    at: key.at,
                    date: key.date,
                    task,
                })
            })
            .collect()
    }

    /// Time of the earliest pending reminder.
    pub fn next_due(&self) -> Option<PrimitiveDateTime> {
        self.entries.keys().next().map(|key| key.at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
