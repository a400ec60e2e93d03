use crate::store::TaskStore;
use std::collections::{BTreeMap, BTreeSet};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightStyle {
    /// Every date with tasks gets the same marker.
    Uniform,
    /// The selected date, when it has tasks, gets its own marker.
    DistinguishSelected,
}

impl HighlightStyle {
    pub fn from_flag(highlight_selected: bool) -> Self {
        if highlight_selected {
            Self::DistinguishSelected
        } else {
            Self::Uniform
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Task,
    Selected,
}

/// Dates that should be marked on a calendar: exactly the dates with tasks.
pub fn highlighted_dates(store: &TaskStore) -> BTreeSet<Date> {
    store.dates().collect()
}

pub fn date_markers(
    store: &TaskStore,
    selected: Option<Date>,
    style: HighlightStyle,
) -> BTreeMap<Date, Marker> {
    store
        .dates()
        .map(|date| {
            let marker = match style {
                HighlightStyle::DistinguishSelected if Some(date) == selected => Marker::Selected,
                _ => Marker::Task,
            };
            (date, marker)
        })
        .collect()
}
