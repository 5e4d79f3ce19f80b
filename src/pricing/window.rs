//! Inclusive validity windows at day granularity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// `[start, end]` with both bounds included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Validated window; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PricingError::InvalidDateRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a window from `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Window from stored bounds, trusted as already validated.
    pub(crate) fn from_bounds(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Inclusive intersection test against an existing window.
    ///
    /// Checks the three ways a candidate can collide: its start falls inside
    /// `existing`, its end falls inside `existing`, or it spans `existing`
    /// entirely. Together these are exactly `a <= d && c <= b`.
    pub fn overlaps(&self, existing: &DateWindow) -> bool {
        let starts_inside = existing.contains(self.start);
        let ends_inside = existing.contains(self.end);
        let contains_existing = self.start <= existing.start && existing.end <= self.end;
        starts_inside || ends_inside || contains_existing
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parse a calendar date (`YYYY-MM-DD`).
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        PricingError::InvalidDateRange(format!("'{}' is not a valid calendar date: {}", value, e))
    })
}
