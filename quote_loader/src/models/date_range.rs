use std::fmt;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Date format the provider expects and the artifact uses.
pub const PROVIDER_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Start date {start} is after end date {end}")]
pub struct DateRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive calendar-day interval with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// `end - start` in whole days (0 for a single day).
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Cuts the range at the end of its first calendar month. The remainder, if any,
    /// starts on the first of the following month.
    pub(crate) fn split_at_month_end(&self) -> (Self, Option<Self>) {
        // start <= last day of its own month, and start <= end
        let head_end = last_day_of_month(self.start).min(self.end);
        let head = Self {
            start: self.start,
            end: head_end,
        };
        let tail = head_end
            .succ_opt()
            .filter(|next| *next <= self.end)
            .map(|next| Self {
                start: next,
                end: self.end,
            });
        (head, tail)
    }

    /// `2024-01-01` for a single day, `2024-01-01 - 2024-01-31` otherwise. Used in
    /// artifact names and notification subjects.
    pub fn label(&self) -> String {
        let start = self.start.format(PROVIDER_DATE_FORMAT);
        if self.start == self.end {
            start.to_string()
        } else {
            format!("{start} - {}", self.end.format(PROVIDER_DATE_FORMAT))
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(PROVIDER_DATE_FORMAT),
            self.end.format(PROVIDER_DATE_FORMAT)
        )
    }
}

fn last_day_of_month(day: NaiveDate) -> NaiveDate {
    let (year, month) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
