//! Events and the date index they are registered in
//!
//! An event is a named or unnamed occasion covering a range of days. Named
//! events come from curated storage directories, unnamed ones are day
//! groupings that were created automatically during earlier imports.

pub mod duration;
pub mod index;

pub use duration::{DayRange, EventDuration};
pub use index::EventIndex;

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;

/// A named or unnamed occasion with a duration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    name: String,
    duration: EventDuration,
}

impl Event {
    pub fn new(name: impl Into<String>, duration: EventDuration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }

    /// Unnamed event covering a single day
    pub fn unnamed_day(date: NaiveDate) -> Self {
        Self::new("", EventDuration::single_day(date))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> &EventDuration {
        &self.duration
    }

    /// An event without a name is an automatically created day grouping
    pub fn is_unnamed(&self) -> bool {
        self.name.is_empty()
    }
}

impl Ord for Event {
    /// Duration first (see [`EventDuration`]), then name.
    fn cmp(&self, other: &Self) -> Ordering {
        self.duration
            .cmp(&other.duration)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.is_unnamed() { "<unnamed>" } else { &self.name };
        match &self.duration {
            EventDuration::WholeDayRange(range) => write!(f, "{} [{}]", name, range),
            EventDuration::Other => write!(f, "{} [other]", name),
        }
    }
}
