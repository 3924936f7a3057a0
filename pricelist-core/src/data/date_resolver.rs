//! Filename → trading date.
//!
//! Price-list documents carry their trading date only in the filename:
//! `<prefix><Month>_<Day>_<Year>.<ext>`, e.g. `DAILY_PRICE_LIST_May_20_2024.pdf`.
//! The convention is brittle, so every deviation is a hard `DateParseError`;
//! a silently skipped file would drop a whole day from the dataset.

use chrono::{Month, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "DAILY_PRICE_LIST_";
pub const DEFAULT_EXTENSION: &str = "pdf";

/// Why a filename did not resolve to a date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("'{file_name}' does not start with the expected prefix '{prefix}'")]
    MissingPrefix { file_name: String, prefix: String },

    #[error("'{file_name}' does not end with the expected extension '.{extension}'")]
    MissingExtension { file_name: String, extension: String },

    #[error("'{file_name}': date segment '{segment}' is not <Month>_<Day>_<Year>")]
    Malformed { file_name: String, segment: String },

    #[error("'{file_name}': '{month}' is not a full English month name")]
    UnknownMonth { file_name: String, month: String },

    #[error("'{file_name}': day '{day}' is not a 1-2 digit number")]
    InvalidDay { file_name: String, day: String },

    #[error("'{file_name}': year '{year}' is not a 4 digit number")]
    InvalidYear { file_name: String, year: String },

    #[error("'{file_name}': {year}-{month:02}-{day:02} is not a calendar date")]
    ImpossibleDate {
        file_name: String,
        year: i32,
        month: u32,
        day: u32,
    },
}

/// Naming convention for input documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateResolver {
    /// Literal marker every filename starts with.
    pub prefix: String,
    /// File extension, without the leading dot.
    pub extension: String,
}

impl DateResolver {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Resolve a bare filename (no directory component) to its trading date.
    pub fn resolve(&self, file_name: &str) -> Result<NaiveDate, DateParseError> {
        let rest = file_name
            .strip_prefix(self.prefix.as_str())
            .ok_or_else(|| DateParseError::MissingPrefix {
                file_name: file_name.to_string(),
                prefix: self.prefix.clone(),
            })?;

        let suffix = format!(".{}", self.extension);
        let segment = rest
            .strip_suffix(suffix.as_str())
            .ok_or_else(|| DateParseError::MissingExtension {
                file_name: file_name.to_string(),
                extension: self.extension.clone(),
            })?;

        let parts: Vec<&str> = segment.split('_').collect();
        let [month, day, year] = parts.as_slice() else {
            return Err(DateParseError::Malformed {
                file_name: file_name.to_string(),
                segment: segment.to_string(),
            });
        };

        let month = parse_month(month).ok_or_else(|| DateParseError::UnknownMonth {
            file_name: file_name.to_string(),
            month: month.to_string(),
        })?;

        let day: u32 = parse_digits(day, 1..=2).ok_or_else(|| DateParseError::InvalidDay {
            file_name: file_name.to_string(),
            day: day.to_string(),
        })?;

        let year: i32 = parse_digits(year, 4..=4).ok_or_else(|| DateParseError::InvalidYear {
            file_name: file_name.to_string(),
            year: year.to_string(),
        })?;

        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DateParseError::ImpossibleDate {
            file_name: file_name.to_string(),
            year,
            month,
            day,
        })
    }

    /// Render the filename this convention expects for `date` (unpadded day).
    pub fn file_name_for(&self, date: NaiveDate) -> String {
        format!("{}{}.{}", self.prefix, date.format("%B_%-d_%Y"), self.extension)
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_EXTENSION)
    }
}

/// Full English month name, ASCII case-insensitive. Abbreviations are rejected.
fn parse_month(name: &str) -> Option<u32> {
    (1u8..=12).find_map(|n| {
        let month = Month::try_from(n).ok()?;
        month
            .name()
            .eq_ignore_ascii_case(name)
            .then_some(u32::from(n))
    })
}

fn parse_digits<T: std::str::FromStr>(text: &str, len: std::ops::RangeInclusive<usize>) -> Option<T> {
    if !len.contains(&text.len()) || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
