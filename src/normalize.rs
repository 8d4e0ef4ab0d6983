//! Reshapes provider payloads into labelled series for charting

use crate::core::{ChartPayload, Range, Symbol};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

const MAX_NAME_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Unix seconds.
    pub timestamp: i64,
    pub label: String,
    /// `None` where the provider reported no close for the bar.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub symbol: Symbol,
    /// Legend text, e.g. `AAPL - Apple Inc.`
    pub label: String,
    pub currency: String,
    pub points: Vec<SeriesPoint>,
}

impl NormalizedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_value(&self) -> Option<(&SeriesPoint, f64)> {
        self.points.iter().find_map(|p| p.value.map(|v| (p, v)))
    }

    pub fn last_value(&self) -> Option<(&SeriesPoint, f64)> {
        self.points.iter().rev().find_map(|p| p.value.map(|v| (p, v)))
    }

    /// Percentage move from the first to the last known close.
    pub fn change_pct(&self) -> Option<f64> {
        let (_, first) = self.first_value()?;
        let (_, last) = self.last_value()?;
        if first > 0.0 {
            Some(((last - first) / first) * 100.0)
        } else {
            None
        }
    }
}

/// Formats an axis label; finer granularity for shorter ranges.
pub fn format_label(timestamp: i64, range: Range, offset: FixedOffset) -> Option<String> {
    let date = DateTime::from_timestamp(timestamp, 0)?.with_timezone(&offset);
    let pattern = match range {
        Range::OneDay => "%H:%M",
        Range::FiveDays | Range::OneMonth => "%b %-d",
        Range::ThreeMonths | Range::SixMonths => "%b",
        _ => "%b %Y",
    };
    Some(date.format(pattern).to_string())
}

pub fn series_label(symbol: &str, short_name: Option<&str>) -> String {
    match short_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.chars().count() > MAX_NAME_CHARS => {
            let truncated: String = name.chars().take(MAX_NAME_CHARS).collect();
            format!("{symbol} - {truncated}...")
        }
        Some(name) => format!("{symbol} - {name}"),
        None => symbol.to_string(),
    }
}

/// Pairs timestamps with closes by position, dropping the tail of the longer array
/// and any timestamp that cannot be represented as a date.
pub fn normalize(symbol: &Symbol, payload: &ChartPayload, range: Range) -> NormalizedSeries {
    let meta = payload.meta();
    let offset = meta
        .gmtoffset
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());

    let points = payload
        .timestamps()
        .iter()
        .zip(payload.closes())
        .filter_map(|(&timestamp, &value)| {
            format_label(timestamp, range, offset).map(|label| SeriesPoint {
                timestamp,
                label,
                value,
            })
        })
        .collect();

    let name = meta.short_name.as_deref().or(meta.long_name.as_deref());
    let display_symbol = meta.symbol.as_deref().unwrap_or(symbol.as_str());

    NormalizedSeries {
        symbol: symbol.clone(),
        label: series_label(display_symbol, name),
        currency: meta
            .currency
            .clone()
            .unwrap_or_else(|| symbol.market().currency().to_string()),
        points,
    }
}
