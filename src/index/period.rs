//! Deduplicated time spans.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::model::Period;

/// Lookup key of a [`PeriodDescriptor`]: `(start, end)` with the end exclusive,
/// `start` absent for instants.
pub type PeriodKey = (Option<NaiveDate>, NaiveDate);

/// One distinct reporting period.
///
/// Many contexts can map onto the same descriptor. Nothing about a context
/// beyond its dates can be read back from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodDescriptor {
    pub start: Option<NaiveDate>,
    /// Exclusive end: the day after the reported end (or instant) date.
    pub end: NaiveDate,
    /// Human-readable end date, e.g. `Dec. 31, 2023`.
    pub label: String,
    pub months: u32,
    pub start_pretty: Option<String>,
    pub end_pretty: String,
}

const PRETTY: &str = "%Y-%m-%dT%H:%M:%S";

impl PeriodDescriptor {
    pub fn key_of(period: &Period) -> PeriodKey {
        match *period {
            Period::Instant { date } => (None, next_day(date)),
            Period::Duration { start, end } => (Some(start), next_day(end)),
        }
    }

    pub fn new(key: PeriodKey) -> Self {
        let (start, end) = key;
        let last_day = end - Duration::days(1);
        Self {
            start,
            end,
            label: last_day.format("%b. %d, %Y").to_string(),
            months: start.map(|s| months_between(s, end)).unwrap_or(0),
            start_pretty: start.map(pretty),
            end_pretty: pretty(last_day),
        }
    }

    pub fn key(&self) -> PeriodKey {
        (self.start, self.end)
    }

    pub fn is_instant(&self) -> bool {
        self.start.is_none()
    }

    /// The reported (inclusive) end or instant date.
    pub fn end_date(&self) -> NaiveDate {
        self.end - Duration::days(1)
    }

    pub fn start_or_instant(&self) -> NaiveDate {
        self.start.unwrap_or(self.end)
    }

    /// Column heading prefix such as `12 Months Ended`.
    pub fn span_heading(&self) -> Option<String> {
        match self.months {
            _ if self.is_instant() => None,
            0 => Some("Less than 1 Month Ended".to_string()),
            1 => Some("1 Month Ended".to_string()),
            n => Some(format!("{} Months Ended", n)),
        }
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn pretty(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.format(PRETTY).to_string())
        .unwrap_or_default()
}

/// Whole months from `start` to the exclusive `end`, rounding half-months up:
/// fifteen days are added to `end` before the calendar delta is taken.
fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let target = end + Duration::days(15);
    if target <= start {
        return 0;
    }
    let mut months = (target.year() as i64 * 12 + target.month0() as i64)
        - (start.year() as i64 * 12 + start.month0() as i64);
    while months > 0 {
        match start.checked_add_months(Months::new(months as u32)) {
            Some(stepped) if stepped <= target => break,
            _ => months -= 1,
        }
    }
    months.max(0) as u32
}

impl fmt::Display for PeriodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start_pretty {
            None => write!(f, "[{}]", &self.end_pretty[..10]),
            Some(start) => write!(f, "[{} {}m {}]", &start[..10], self.months, &self.end_pretty[..10]),
        }
    }
}
