use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::mem::replace;

/// A date range iterator that yields each date from the start date
/// through the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0.succ_opt()?;
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

/// A half-open window `[start, end)` over which a source is aggregated.
#[derive(Clone, Eq, PartialEq, Copy, Debug, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The window of `length_days` days that ends (exclusive) on `end`.
    pub fn ending_at(end: NaiveDate, length_days: u32) -> Option<DateWindow> {
        let start = end.checked_sub_days(Days::new(u64::from(length_days)))?;
        Some(DateWindow { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Every day inside the window.
    pub fn days(&self) -> DateRange {
        match self.end.pred_opt() {
            Some(last) => DateRange(self.start, last),
            // end is NaiveDate::MIN, nothing can precede it
            None => DateRange(NaiveDate::MAX, NaiveDate::MIN),
        }
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Offsets (in days before "now") walked by the backward search:
/// `0, step, 2*step, ...` while the offset stays within the horizon.
#[derive(Clone, Copy, Debug)]
pub struct BackwardOffsets {
    next: Option<u32>,
    step: u32,
    horizon: u32,
}

impl BackwardOffsets {
    pub fn new(step: u32, horizon: u32) -> BackwardOffsets {
        BackwardOffsets {
            next: Some(0),
            step: step.max(1),
            horizon,
        }
    }
}

impl Iterator for BackwardOffsets {
    type Item = u32;
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|offset| *offset <= self.horizon)?;
        self.next = current.checked_add(self.step);
        Some(current)
    }
}
