//! Raw table blocks → typed `StockRecord`s.
//!
//! Normalization never fails: a bad cell becomes "no value", a junk row is
//! dropped, and a missing column leaves the field empty for every row. Each
//! of these is reported as a `NormalizationWarning` so the run summary can
//! count them.

use super::columns::{ColumnMap, HeaderMapping};
use crate::domain::{CanonicalColumn, RawTableBlock, StockRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Cell text meaning "nothing reported".
const NO_VALUE_TOKENS: &[&str] = &["-", "--", "n/a", "na", "nil", "null"];

const CURRENCY_SYMBOLS: &[char] = &['₦', '$', '€', '£', '¥'];

const CURRENCY_CODES: &[&str] = &["NGN", "USD"];

/// Column layout of the NGX daily price list.
pub const NGX_LAYOUT: &[&str] = &[
    "S/N", "Symbol", "P_Close", "Open", "High", "Low", "Close", "Change", "%", "Deals", "Volume",
    "Value", "VWAP",
];

pub const DEFAULT_NON_DATA_MARKERS: &[&str] = &[
    "TOTAL",
    "GRAND TOTAL",
    "SUB-TOTAL",
    "SUBTOTAL",
    "NIGERIAN EXCHANGE",
];

/// Normalizer settings, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Identifier texts marking section banners and summary rows.
    pub non_data_markers: Vec<String>,
    /// Positional layout used when a block's own header is unrecognized.
    pub fallback_header: Option<Vec<String>>,
    /// Extra header aliases on top of the built-in synonym table.
    pub synonyms: BTreeMap<String, CanonicalColumn>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            non_data_markers: DEFAULT_NON_DATA_MARKERS.iter().map(|m| m.to_string()).collect(),
            fallback_header: Some(NGX_LAYOUT.iter().map(|c| c.to_string()).collect()),
            synonyms: BTreeMap::new(),
        }
    }
}

/// Why a body row was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    EmptyIdentifier,
    NonDataMarker(String),
    RepeatedHeader,
}

/// A locally recovered problem inside one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationWarning {
    /// A required numeric column is absent; every row gets "no value".
    MissingColumn { page: u32, column: CanonicalColumn },
    /// A numeric cell could not be parsed and became "no value".
    UnparseableCell {
        page: u32,
        row: usize,
        column: CanonicalColumn,
        raw: String,
    },
    /// A body row was dropped.
    RowDropped { page: u32, row: usize, reason: DropReason },
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationWarning::MissingColumn { page, column } => {
                write!(f, "page {page}: no '{column}' column")
            }
            NormalizationWarning::UnparseableCell {
                page,
                row,
                column,
                raw,
            } => write!(f, "page {page} row {row}: '{raw}' is not a number ({column})"),
            NormalizationWarning::RowDropped { page, row, reason } => {
                write!(f, "page {page} row {row}: dropped ({reason:?})")
            }
        }
    }
}

/// Result of normalizing one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBlock {
    pub records: Vec<StockRecord>,
    pub warnings: Vec<NormalizationWarning>,
    /// Numeric columns this block's layout actually carried.
    pub columns: BTreeSet<CanonicalColumn>,
}

/// Outcome of coercing one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    Number(f64),
    /// Empty, or an explicit "nothing reported" token.
    Blank,
    Invalid,
}

impl NumericCell {
    pub fn value(self) -> Option<f64> {
        match self {
            NumericCell::Number(v) => Some(v),
            NumericCell::Blank | NumericCell::Invalid => None,
        }
    }
}

/// Coerce a cell: strips thousands separators, currency symbols and codes,
/// a leading `+`; `(x)` reads as negative.
pub fn parse_number(cell: &str) -> NumericCell {
    let trimmed = cell.trim();
    if trimmed.is_empty() || NO_VALUE_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        return NumericCell::Blank;
    }

    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };

    let mut body = body;
    for code in CURRENCY_CODES {
        let upper = body.to_ascii_uppercase();
        if upper.starts_with(code) {
            body = &body[code.len()..];
        } else if upper.ends_with(code) {
            body = &body[..body.len() - code.len()];
        }
    }

    let cleaned: String = body
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SYMBOLS.contains(c) && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => NumericCell::Number(if negative { -v } else { v }),
        _ => NumericCell::Invalid,
    }
}

fn filled(row: &[String]) -> usize {
    row.iter().filter(|cell| !cell.trim().is_empty()).count()
}

/// Trim and collapse internal whitespace of a company identifier.
pub fn clean_identifier(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Body rows searched for the real header when the block's first line is not one.
const HEADER_SCAN_ROWS: usize = 3;

/// Where a block's column names came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSource {
    /// The block's first line.
    Block,
    /// A body row; the lines above it are a title preamble.
    Row(usize),
    /// The configured fallback layout, applied by position.
    Fallback,
}

/// How a block's cells line up with canonical columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub mapping: HeaderMapping,
    pub source: HeaderSource,
    /// The block's first line is data, not a header (headerless continuation page).
    pub header_is_data: bool,
    /// Identifier header text, used to spot repeated header rows.
    identifier_header: Option<String>,
}

impl BlockLayout {
    /// Index into `block.rows` of the first data row.
    fn body_start(&self) -> usize {
        match self.source {
            HeaderSource::Row(index) => index + 1,
            HeaderSource::Block | HeaderSource::Fallback => 0,
        }
    }
}

/// Converts raw blocks into records for one trading date.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    columns: ColumnMap,
    markers: Vec<String>,
    fallback_header: Option<Vec<String>>,
}

impl RecordNormalizer {
    pub fn new(options: &NormalizeOptions) -> Self {
        let columns = options
            .synonyms
            .iter()
            .fold(ColumnMap::builtin(), |map, (alias, column)| {
                map.with_synonym(alias, *column)
            });
        let markers = options
            .non_data_markers
            .iter()
            .map(|m| clean_identifier(m).to_uppercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self {
            columns,
            markers,
            fallback_header: options.fallback_header.clone(),
        }
    }

    /// Work out the layout of a block, or `None` when it is not a price table.
    ///
    /// The block's own header is tried first, then the first few body rows:
    /// a title line wide enough to start the table can sit above the real
    /// header. A row only counts as the header when every line above it is
    /// narrower, so a continuation page never loses data rows this way.
    /// Failing both, and if the block is exactly as wide as the fallback
    /// header, the fallback layout is applied positionally.
    pub fn layout(&self, block: &RawTableBlock) -> Option<BlockLayout> {
        let own = self.columns.map_header(&block.header);
        if own.is_usable() {
            return Some(self.named(own, &block.header, HeaderSource::Block));
        }

        let mut widest_above = filled(&block.header);
        for (index, row) in block.rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
            let width = filled(row);
            if width > widest_above {
                let mapping = self.columns.map_header(row);
                if mapping.is_usable() {
                    return Some(self.named(mapping, row, HeaderSource::Row(index)));
                }
            }
            widest_above = widest_above.max(width);
        }

        let fallback = self.fallback_header.as_ref()?;
        if fallback.len() != block.width() {
            return None;
        }
        let mapping = self.columns.map_header(fallback);
        if !mapping.is_usable() {
            return None;
        }
        // A header row in an unknown dialect still names some column; a row
        // that names nothing is the first data row of a continuation page.
        let header_is_data = own.columns().next().is_none();
        let names = if header_is_data { fallback } else { &block.header };
        let identifier_header = mapping
            .position(CanonicalColumn::Symbol)
            .and_then(|i| names.get(i).cloned());
        Some(BlockLayout {
            mapping,
            source: HeaderSource::Fallback,
            header_is_data,
            identifier_header,
        })
    }

    fn named(&self, mapping: HeaderMapping, header: &[String], source: HeaderSource) -> BlockLayout {
        let identifier_header = mapping
            .position(CanonicalColumn::Symbol)
            .and_then(|i| header.get(i).cloned());
        BlockLayout {
            mapping,
            source,
            header_is_data: false,
            identifier_header,
        }
    }

    /// Header match used to select relevant blocks.
    pub fn matches(&self, block: &RawTableBlock) -> bool {
        self.layout(block).is_some()
    }

    /// Normalize a block for `date`. Unrecognized blocks produce no records.
    pub fn normalize(&self, block: &RawTableBlock, date: NaiveDate) -> NormalizedBlock {
        let page = block.page;
        let Some(layout) = self.layout(block) else {
            return NormalizedBlock {
                warnings: vec![NormalizationWarning::MissingColumn {
                    page,
                    column: CanonicalColumn::Symbol,
                }],
                ..NormalizedBlock::default()
            };
        };

        let mut out = NormalizedBlock::default();
        for column in [CanonicalColumn::Close, CanonicalColumn::Volume] {
            if !layout.mapping.contains(column) {
                out.warnings
                    .push(NormalizationWarning::MissingColumn { page, column });
            }
        }
        out.columns = layout.mapping.columns().filter(|c| c.is_numeric()).collect();

        let first = layout.header_is_data.then_some(&block.header);
        let body = block.rows.iter().skip(layout.body_start());
        for (index, row) in first.into_iter().chain(body).enumerate() {
            let row_number = index + 1;
            match self.normalize_row(row, date, &layout) {
                Ok((record, cell_warnings)) => {
                    out.warnings
                        .extend(cell_warnings.into_iter().map(|(column, raw)| {
                            NormalizationWarning::UnparseableCell {
                                page,
                                row: row_number,
                                column,
                                raw,
                            }
                        }));
                    out.records.push(record);
                }
                Err(reason) => out.warnings.push(NormalizationWarning::RowDropped {
                    page,
                    row: row_number,
                    reason,
                }),
            }
        }

        tracing::debug!(
            page,
            records = out.records.len(),
            warnings = out.warnings.len(),
            "normalized block"
        );
        out
    }

    fn normalize_row(
        &self,
        row: &[String],
        date: NaiveDate,
        layout: &BlockLayout,
    ) -> Result<(StockRecord, Vec<(CanonicalColumn, String)>), DropReason> {
        let symbol_at = layout
            .mapping
            .position(CanonicalColumn::Symbol)
            .ok_or(DropReason::EmptyIdentifier)?;
        let symbol = clean_identifier(row.get(symbol_at).map(String::as_str).unwrap_or(""));
        if symbol.is_empty() {
            return Err(DropReason::EmptyIdentifier);
        }
        if let Some(marker) = self.marker_in(&symbol, row) {
            return Err(DropReason::NonDataMarker(marker));
        }
        if let Some(header) = &layout.identifier_header {
            if clean_identifier(header).eq_ignore_ascii_case(&symbol) {
                return Err(DropReason::RepeatedHeader);
            }
        }

        let mut record = StockRecord::empty(date, symbol);
        let mut bad_cells = Vec::new();
        for column in CanonicalColumn::NUMERIC {
            let Some(at) = layout.mapping.position(column) else {
                continue;
            };
            let raw = row.get(at).map(String::as_str).unwrap_or("");
            let cell = parse_number(raw);
            if cell == NumericCell::Invalid {
                bad_cells.push((column, raw.trim().to_string()));
            }
            record.set_value(column, cell.value());
        }
        Ok((record, bad_cells))
    }

    fn marker_in(&self, symbol: &str, row: &[String]) -> Option<String> {
        let upper = symbol.to_uppercase();
        let by_identifier = self.markers.iter().find(|marker| {
            upper == **marker
                || upper
                    .strip_prefix(marker.as_str())
                    .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with(':'))
        });
        if let Some(marker) = by_identifier {
            return Some(marker.clone());
        }
        row.iter().find_map(|cell| {
            let cell = clean_identifier(cell).to_uppercase();
            self.markers.iter().find(|marker| **marker == cell).cloned()
        })
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(&NormalizeOptions::default())
    }
}
