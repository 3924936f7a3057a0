//! Header cell → canonical column mapping.

use crate::domain::CanonicalColumn;
use std::collections::{BTreeMap, HashMap};

/// Built-in synonyms, keyed by normalized header text.
const BUILTIN_SYNONYMS: &[(&str, CanonicalColumn)] = &[
    ("symbol", CanonicalColumn::Symbol),
    ("ticker", CanonicalColumn::Symbol),
    ("company", CanonicalColumn::Symbol),
    ("security", CanonicalColumn::Symbol),
    ("stock", CanonicalColumn::Symbol),
    ("code", CanonicalColumn::Symbol),
    ("close", CanonicalColumn::Close),
    ("closing", CanonicalColumn::Close),
    ("closing price", CanonicalColumn::Close),
    ("close price", CanonicalColumn::Close),
    ("last price", CanonicalColumn::Close),
    ("volume", CanonicalColumn::Volume),
    ("vol", CanonicalColumn::Volume),
    ("volume traded", CanonicalColumn::Volume),
    ("quantity traded", CanonicalColumn::Volume),
    ("qty traded", CanonicalColumn::Volume),
    ("open", CanonicalColumn::Open),
    ("opening price", CanonicalColumn::Open),
    ("open price", CanonicalColumn::Open),
    ("high", CanonicalColumn::High),
    ("high price", CanonicalColumn::High),
    ("day high", CanonicalColumn::High),
    ("low", CanonicalColumn::Low),
    ("low price", CanonicalColumn::Low),
    ("day low", CanonicalColumn::Low),
];

/// Normalize header text: lowercase, `_ - .` as spaces, collapsed whitespace.
///
/// `P_Close` becomes `p close`, so a previous-close column never maps to `close`.
pub fn normalize_header(cell: &str) -> String {
    cell.chars()
        .map(|c| match c {
            '_' | '-' | '.' => ' ',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Synonym table from header text to canonical column.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    synonyms: HashMap<String, CanonicalColumn>,
}

impl ColumnMap {
    /// The built-in synonym table.
    pub fn builtin() -> Self {
        let synonyms = BUILTIN_SYNONYMS
            .iter()
            .map(|(alias, column)| (alias.to_string(), *column))
            .collect();
        Self { synonyms }
    }

    /// Add (or override) an alias. The alias is normalized like header cells.
    pub fn with_synonym(mut self, alias: &str, column: CanonicalColumn) -> Self {
        self.synonyms.insert(normalize_header(alias), column);
        self
    }

    pub fn resolve(&self, header_cell: &str) -> Option<CanonicalColumn> {
        self.synonyms.get(&normalize_header(header_cell)).copied()
    }

    /// Map a header row. The first cell mapping to a canonical column wins.
    pub fn map_header(&self, header: &[String]) -> HeaderMapping {
        let mut positions = BTreeMap::new();
        for (index, cell) in header.iter().enumerate() {
            if let Some(column) = self.resolve(cell) {
                positions.entry(column).or_insert(index);
            }
        }
        HeaderMapping { positions }
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Canonical column → cell index for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    positions: BTreeMap<CanonicalColumn, usize>,
}

impl HeaderMapping {
    pub fn position(&self, column: CanonicalColumn) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn contains(&self, column: CanonicalColumn) -> bool {
        self.positions.contains_key(&column)
    }

    /// Mapped columns in canonical order.
    pub fn columns(&self) -> impl Iterator<Item = CanonicalColumn> + '_ {
        self.positions.keys().copied()
    }

    /// A block is usable when it has an identifier plus a close or a volume.
    pub fn is_usable(&self) -> bool {
        self.contains(CanonicalColumn::Symbol)
            && (self.contains(CanonicalColumn::Close) || self.contains(CanonicalColumn::Volume))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(normalize_header("  Closing\n  PRICE "), "closing price");
        assert_eq!(normalize_header("P_Close"), "p close");
        assert_eq!(normalize_header("Vol."), "vol");
    }

    #[test]
    fn resolves_synonyms_case_insensitively() {
        let map = ColumnMap::builtin();
        assert_eq!(map.resolve("CLOSE"), Some(CanonicalColumn::Close));
        assert_eq!(map.resolve("Closing Price"), Some(CanonicalColumn::Close));
        assert_eq!(map.resolve("Ticker"), Some(CanonicalColumn::Symbol));
        assert_eq!(map.resolve("P_Close"), None);
        assert_eq!(map.resolve("VWAP"), None);
    }

    #[test]
    fn ngx_layout_maps_expected_columns() {
        let ngx = header(&[
            "S/N", "Symbol", "P_Close", "Open", "High", "Low", "Close", "Change", "%", "Deals",
            "Volume", "Value", "VWAP",
        ]);
        let mapping = ColumnMap::builtin().map_header(&ngx);
        assert_eq!(mapping.position(CanonicalColumn::Symbol), Some(1));
        assert_eq!(mapping.position(CanonicalColumn::Open), Some(3));
        assert_eq!(mapping.position(CanonicalColumn::Close), Some(6));
        assert_eq!(mapping.position(CanonicalColumn::Volume), Some(10));
        assert!(mapping.is_usable());
    }

    #[test]
    fn first_synonym_wins() {
        let mapping = ColumnMap::builtin().map_header(&header(&["Symbol", "Close", "Closing Price"]));
        assert_eq!(mapping.position(CanonicalColumn::Close), Some(1));
    }

    #[test]
    fn custom_synonym_extends_builtin() {
        let map = ColumnMap::builtin().with_synonym("Cours de clôture", CanonicalColumn::Close);
        assert_eq!(map.resolve("cours de clôture"), Some(CanonicalColumn::Close));
    }

    #[test]
    fn block_without_identifier_is_not_usable() {
        let mapping = ColumnMap::builtin().map_header(&header(&["Date", "Close", "Volume"]));
        assert!(!mapping.is_usable());
    }
}
