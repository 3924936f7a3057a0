//! StockRecord: one company's figures for one trading date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical output column.
///
/// Every source header is mapped onto one of these (or dropped). The
/// serialized names are the column names used in exported tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalColumn {
    Symbol,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl CanonicalColumn {
    /// Numeric columns in export order.
    pub const NUMERIC: [CanonicalColumn; 5] = [
        CanonicalColumn::Open,
        CanonicalColumn::High,
        CanonicalColumn::Low,
        CanonicalColumn::Close,
        CanonicalColumn::Volume,
    ];

    /// Columns every merged dataset carries, whatever the source layouts.
    pub const REQUIRED: [CanonicalColumn; 3] = [
        CanonicalColumn::Symbol,
        CanonicalColumn::Close,
        CanonicalColumn::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalColumn::Symbol => "symbol",
            CanonicalColumn::Open => "open",
            CanonicalColumn::High => "high",
            CanonicalColumn::Low => "low",
            CanonicalColumn::Close => "close",
            CanonicalColumn::Volume => "volume",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, CanonicalColumn::Symbol)
    }

    /// Open/high/low are optional: only present when some source layout carried them.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            CanonicalColumn::Open | CanonicalColumn::High | CanonicalColumn::Low
        )
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One company's data for one trading date.
///
/// Numeric fields use `None` as the "no value" marker: the field was absent
/// from the source layout or its cell could not be parsed. `Some(0.0)` is a
/// genuine reported zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl StockRecord {
    /// A record with every numeric field set to "no value".
    pub fn empty(date: NaiveDate, symbol: impl Into<String>) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        }
    }

    /// Numeric value for a canonical column. `Symbol` has no numeric value.
    pub fn value(&self, column: CanonicalColumn) -> Option<f64> {
        match column {
            CanonicalColumn::Symbol => None,
            CanonicalColumn::Open => self.open,
            CanonicalColumn::High => self.high,
            CanonicalColumn::Low => self.low,
            CanonicalColumn::Close => self.close,
            CanonicalColumn::Volume => self.volume,
        }
    }

    pub fn set_value(&mut self, column: CanonicalColumn, value: Option<f64>) {
        match column {
            CanonicalColumn::Symbol => {}
            CanonicalColumn::Open => self.open = value,
            CanonicalColumn::High => self.high = value,
            CanonicalColumn::Low => self.low = value,
            CanonicalColumn::Close => self.close = value,
            CanonicalColumn::Volume => self.volume = value,
        }
    }

    /// Merge key: (trading date, company identifier).
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.symbol.as_str())
    }
}
