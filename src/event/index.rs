//! Date-keyed event registry
//!
//! Every registered event is stored under each day it covers. Within a day
//! events are kept sorted by the event ordering, so the first event of a day
//! is its canonical owner.

use super::Event;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Registry of events by calendar day for one category key
#[derive(Debug, Clone, Default)]
pub struct EventIndex {
    by_date: BTreeMap<NaiveDate, BTreeSet<Event>>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event under every day of its range.
    ///
    /// Returns `true` if the event was added to at least one day. Events
    /// without a whole-day range cannot be placed and are ignored.
    pub fn register(&mut self, event: &Event) -> bool {
        let Some(range) = event.duration().day_range() else {
            debug!(%event, "Ignoring event without a whole-day range");
            return false;
        };

        let mut added = false;
        for day in range.days() {
            let bucket = self.by_date.entry(day).or_default();
            if !bucket.contains(event) {
                bucket.insert(event.clone());
                added = true;
            }
        }

        if added {
            trace!(%event, "Registered event");
        }
        added
    }

    /// Register every event that has a whole-day range
    pub fn register_all<'a, I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = &'a Event>,
    {
        events
            .into_iter()
            .filter(|event| event.duration().is_whole_day_range())
            .filter(|event| self.register(event))
            .count()
    }

    /// Whether any event covers `date`
    pub fn has_event(&self, date: NaiveDate) -> bool {
        self.by_date
            .get(&date)
            .is_some_and(|bucket| !bucket.is_empty())
    }

    /// Events covering `date`, in event order
    pub fn events_on(&self, date: NaiveDate) -> impl Iterator<Item = &Event> {
        self.by_date.get(&date).into_iter().flatten()
    }

    /// The canonical event of `date`
    pub fn first_event(&self, date: NaiveDate) -> Result<&Event> {
        self.by_date
            .get(&date)
            .and_then(|bucket| bucket.first())
            .ok_or(Error::NotFound(date))
    }

    /// The canonical event of `date`, creating an unnamed single-day event
    /// when the day has none yet.
    pub fn get_or_create_first_event(&mut self, date: NaiveDate) -> Event {
        if let Some(event) = self.by_date.get(&date).and_then(|bucket| bucket.first()) {
            return event.clone();
        }

        let event = Event::unnamed_day(date);
        debug!(%date, "Creating unnamed event for day");
        self.register(&event);
        event
    }

    /// All registered events, deduplicated and in event order
    pub fn all_events(&self) -> BTreeSet<Event> {
        self.by_date.values().flatten().cloned().collect()
    }

    /// Number of days that have at least one event
    pub fn day_count(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
