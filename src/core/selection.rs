//! Chart range and sampling interval selectors

use super::error::SelectionError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Range {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Range {
    pub const ALL: [Range; 11] = [
        Range::OneDay,
        Range::FiveDays,
        Range::OneMonth,
        Range::ThreeMonths,
        Range::SixMonths,
        Range::OneYear,
        Range::TwoYears,
        Range::FiveYears,
        Range::TenYears,
        Range::YearToDate,
        Range::Max,
    ];

    /// Provider query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Range::OneDay => "1d",
            Range::FiveDays => "5d",
            Range::OneMonth => "1mo",
            Range::ThreeMonths => "3mo",
            Range::SixMonths => "6mo",
            Range::OneYear => "1y",
            Range::TwoYears => "2y",
            Range::FiveYears => "5y",
            Range::TenYears => "10y",
            Range::YearToDate => "ytd",
            Range::Max => "max",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Range::OneDay => "1 Day",
            Range::FiveDays => "5 Days",
            Range::OneMonth => "1 Month",
            Range::ThreeMonths => "3 Months",
            Range::SixMonths => "6 Months",
            Range::OneYear => "1 Year",
            Range::TwoYears => "2 Years",
            Range::FiveYears => "5 Years",
            Range::TenYears => "10 Years",
            Range::YearToDate => "Year to Date",
            Range::Max => "Max",
        }
    }

    /// Interval used when the caller has not picked one.
    pub fn default_interval(&self) -> Interval {
        match self {
            Range::OneDay => Interval::FiveMinutes,
            Range::FiveDays => Interval::OneDay,
            _ => Interval::OneWeek,
        }
    }

    pub fn supported_intervals(&self) -> &'static [Interval] {
        match self {
            Range::OneDay => &[
                Interval::OneMinute,
                Interval::FiveMinutes,
                Interval::FifteenMinutes,
            ],
            Range::FiveDays => &[Interval::OneHour, Interval::OneDay],
            _ => &[Interval::OneDay, Interval::OneWeek, Interval::OneMonth],
        }
    }

    pub fn supports(&self, interval: Interval) -> bool {
        self.supported_intervals().contains(&interval)
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Range {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Range::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| SelectionError::UnknownRange(s.to_string()))
    }
}

impl TryFrom<String> for Range {
    type Error = SelectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Range> for String {
    fn from(value: Range) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    pub const ALL: [Interval; 7] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::OneWeek,
        Interval::OneMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1 Minute",
            Interval::FiveMinutes => "5 Minutes",
            Interval::FifteenMinutes => "15 Minutes",
            Interval::OneHour => "1 Hour",
            Interval::OneDay => "1 Day",
            Interval::OneWeek => "1 Week",
            Interval::OneMonth => "1 Month",
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == wanted)
            .ok_or_else(|| SelectionError::UnknownInterval(s.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = SelectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

/// A validated (range, interval) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    range: Range,
    interval: Interval,
}

impl Selection {
    /// Falls back to the range's default interval when `interval` is `None`.
    pub fn new(range: Range, interval: Option<Interval>) -> Result<Self, SelectionError> {
        let interval = interval.unwrap_or_else(|| range.default_interval());
        if !range.supports(interval) {
            return Err(SelectionError::Unsupported {
                range: range.to_string(),
                interval: interval.to_string(),
            });
        }
        Ok(Self { range, interval })
    }

    /// Fills in whatever was left unset. Nothing set gives the default selection; a
    /// range on its own takes that range's default interval; an interval on its own
    /// applies to the default range.
    pub fn resolve(
        range: Option<Range>,
        interval: Option<Interval>,
    ) -> Result<Self, SelectionError> {
        match (range, interval) {
            (None, None) => Ok(Self::default()),
            (range, interval) => Self::new(range.unwrap_or(Self::default().range), interval),
        }
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            range: Range::OneMonth,
            interval: Interval::OneDay,
        }
    }
}

impl Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.range.label(), self.interval.label())
    }
}
