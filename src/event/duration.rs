//! Event durations

use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DayRange {
    /// Create a range covering `start..=end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering exactly one day
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start_inclusive(&self) -> NaiveDate {
        self.start
    }

    pub fn end_inclusive(&self) -> NaiveDate {
        self.end
    }

    /// Every day of the range in ascending order.
    ///
    /// Each call starts a fresh iterator.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// Number of days covered
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// A range always covers at least one day
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..={}", self.start, self.end)
        }
    }
}

/// How long an event lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventDuration {
    /// Whole days from start to end, both inclusive
    WholeDayRange(DayRange),
    /// Any other kind of duration. Such events cannot be placed into a
    /// date index.
    Other,
}

impl EventDuration {
    /// Whole-day duration over `start..=end`
    pub fn whole_days(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        DayRange::new(start, end).map(EventDuration::WholeDayRange)
    }

    pub fn single_day(date: NaiveDate) -> Self {
        EventDuration::WholeDayRange(DayRange::single(date))
    }

    pub fn day_range(&self) -> Option<&DayRange> {
        match self {
            EventDuration::WholeDayRange(range) => Some(range),
            EventDuration::Other => None,
        }
    }

    pub fn is_whole_day_range(&self) -> bool {
        matches!(self, EventDuration::WholeDayRange(_))
    }
}

impl Ord for EventDuration {
    /// `Other` sorts before any whole-day range; ranges sort by start, then end.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (EventDuration::Other, EventDuration::Other) => Ordering::Equal,
            (EventDuration::Other, EventDuration::WholeDayRange(_)) => Ordering::Less,
            (EventDuration::WholeDayRange(_), EventDuration::Other) => Ordering::Greater,
            (EventDuration::WholeDayRange(a), EventDuration::WholeDayRange(b)) => a
                .start
                .cmp(&b.start)
                .then_with(|| a.end.cmp(&b.end)),
        }
    }
}

impl PartialOrd for EventDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
