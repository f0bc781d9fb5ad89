//! Seasons, month windows and observation date ranges

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Growing season a classification run targets.
///
/// The two seasons get separate label rules because classes separate
/// differently in the dry summer and the wet winter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Summer,
    Winter,
}

impl Season {
    pub const ALL: [Season; 2] = [Season::Summer, Season::Winter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Summer => "summer",
            Season::Winter => "winter",
        }
    }

    /// Months covered by the season: April to September for summer,
    /// October to March (wrapping year-end) for winter.
    pub fn window(&self) -> MonthWindow {
        match self {
            Season::Summer => MonthWindow { start: 4, end: 9 },
            Season::Winter => MonthWindow { start: 10, end: 3 },
        }
    }

    /// Observation dates of the season that starts in `year`.
    ///
    /// The winter of 2017 runs from October 2017 to the end of March 2018.
    pub fn date_range(&self, year: i32) -> Result<DateRange> {
        let (start, end) = match self {
            Season::Summer => (ymd(year, 4, 1)?, ymd(year, 10, 1)?),
            Season::Winter => (ymd(year, 10, 1)?, ymd(year + 1, 4, 1)?),
        };
        DateRange::new(start, end)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summer" => Ok(Season::Summer),
            "winter" => Ok(Season::Winter),
            _ => Err(Error::UnknownSeason(s.to_string())),
        }
    }
}

/// Inclusive range of calendar months.
///
/// When `start > end` the window wraps year-end and is the union of
/// `start..=12` and `1..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMonthWindow")]
pub struct MonthWindow {
    start: u32,
    end: u32,
}

impl MonthWindow {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        for (name, m) in [("start_month", start), ("end_month", end)] {
            if !(1..=12).contains(&m) {
                return Err(Error::InvalidParameter {
                    name,
                    value: m.to_string(),
                    reason: "month must be in 1..=12".into(),
                });
            }
        }
        Ok(Self { start, end })
    }

    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    /// The non-wrapping inclusive intervals making up the window
    pub fn intervals(&self) -> Vec<(u32, u32)> {
        if self.wraps() {
            vec![(self.start, 12), (1, self.end)]
        } else {
            vec![(self.start, self.end)]
        }
    }

    pub fn contains(&self, month: u32) -> bool {
        self.intervals()
            .iter()
            .any(|&(lo, hi)| (lo..=hi).contains(&month))
    }

    /// Months of the window in chronological order from `start`
    pub fn months(&self) -> Vec<u32> {
        self.intervals()
            .into_iter()
            .flat_map(|(lo, hi)| lo..=hi)
            .collect()
    }
}

#[derive(Deserialize)]
struct RawMonthWindow {
    start: u32,
    end: u32,
}

impl TryFrom<RawMonthWindow> for MonthWindow {
    type Error = Error;

    fn try_from(raw: RawMonthWindow) -> Result<Self> {
        MonthWindow::new(raw.start, raw.end)
    }
}

/// Half-open date interval `[start, end)` of acquisitions to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidParameter {
                name: "date_range",
                value: format!("{} .. {}", start, end),
                reason: "start must be before end".into(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::InvalidParameter {
                name: "date_range",
                value: s.to_string(),
                reason: e.to_string(),
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// The calendar year `year`
    pub fn year(year: i32) -> Result<Self> {
        Self::new(ymd(year, 1, 1)?, ymd(year + 1, 1, 1)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Year the range starts in, used to tag products
    pub fn start_year(&self) -> i32 {
        self.start.year()
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| Error::InvalidParameter {
        name: "date",
        value: format!("{}-{}-{}", year, month, day),
        reason: "not a calendar date".into(),
    })
}
