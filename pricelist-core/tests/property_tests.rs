//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Filename dates round-trip through the resolver
//! 2. Missing cells never become zero
//! 3. Merge keeps exactly one row per (date, company), first occurrence wins
//! 4. Date filtering returns exactly that date's rows
//! 5. Returns and correlations stay well-formed over sparse data

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use pricelist_core::analytics::{compute_returns, pearson};
use pricelist_core::data::normalize::{parse_number, NumericCell};
use pricelist_core::data::{merge, DateResolver};
use pricelist_core::domain::StockRecord;
use std::collections::HashMap;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1900i32..2100, 1u32..=12, 1u32..=31)
        .prop_filter_map("valid calendar date", |(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d)
        })
}

fn arb_symbol() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["ABC", "XYZ", "DANGCEM", "MTNN", "ZENITHBANK"])
        .prop_map(String::from)
}

fn arb_value() -> impl Strategy<Value = Option<f64>> {
    prop::option::weighted(0.7, (0.0..5000.0_f64).prop_map(|v| (v * 100.0).round() / 100.0))
}

fn arb_record() -> impl Strategy<Value = StockRecord> {
    (0u32..10, arb_symbol(), arb_value(), arb_value()).prop_map(|(offset, symbol, close, volume)| {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(offset as u64);
        StockRecord {
            close,
            volume,
            ..StockRecord::empty(date, symbol)
        }
    })
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<StockRecord>>> {
    prop::collection::vec(prop::collection::vec(arb_record(), 0..12), 0..6)
}

// ── 1. Date round trip ───────────────────────────────────────────────

proptest! {
    #[test]
    fn filename_date_round_trip(date in arb_date()) {
        let resolver = DateResolver::default();
        let name = resolver.file_name_for(date);
        prop_assert_eq!(resolver.resolve(&name), Ok(date));
    }

    #[test]
    fn month_case_is_ignored(date in arb_date()) {
        let resolver = DateResolver::default();
        let name = resolver.file_name_for(date);
        let prefix_len = "DAILY_PRICE_LIST_".len();
        let shouted = format!("{}{}", &name[..prefix_len], name[prefix_len..].to_uppercase());
        let shouted = shouted.replace(".PDF", ".pdf");
        prop_assert_eq!(resolver.resolve(&shouted).map(|d| d.year()), Ok(date.year()));
    }
}

// ── 2. Missing never becomes zero ────────────────────────────────────

proptest! {
    #[test]
    fn blank_cells_are_never_numbers(pad in "[ \t]{0,4}", token in prop::sample::select(vec!["", "-", "--", "N/A", "n/a", "nil"])) {
        let cell = format!("{pad}{token}{pad}");
        prop_assert_eq!(parse_number(&cell), NumericCell::Blank);
    }

    #[test]
    fn thousands_separators_are_stripped(whole in 0u64..10_000_000) {
        let digits = whole.to_string();
        let mut grouped = String::new();
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        prop_assert_eq!(parse_number(&grouped), NumericCell::Number(whole as f64));
    }
}

// ── 3. Merge policy ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_keeps_first_occurrence(batches in arb_batches()) {
        let mut first: HashMap<(NaiveDate, String), StockRecord> = HashMap::new();
        for record in batches.iter().flatten() {
            first.entry((record.date, record.symbol.clone())).or_insert_with(|| record.clone());
        }

        let dataset = merge(batches);
        prop_assert!(dataset.validate().is_ok());
        prop_assert_eq!(dataset.len(), first.len());
        for record in &dataset {
            let expected = &first[&(record.date, record.symbol.clone())];
            prop_assert_eq!(record, expected);
        }
    }

    #[test]
    fn merged_rows_are_sorted(batches in arb_batches()) {
        let dataset = merge(batches);
        for pair in dataset.records().windows(2) {
            prop_assert!(pair[0].key() < pair[1].key());
        }
    }
}

// ── 4. Date filtering ────────────────────────────────────────────────

proptest! {
    #[test]
    fn filter_date_is_exact(batches in arb_batches(), offset in 0u32..10) {
        let dataset = merge(batches);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(offset as u64);
        let filtered = dataset.filter_date(date);
        let expected = dataset.iter().filter(|r| r.date == date).count();
        prop_assert_eq!(filtered.len(), expected);
        prop_assert!(filtered.iter().all(|r| r.date == date));
    }
}

// ── 5. Analytics well-formedness ─────────────────────────────────────

proptest! {
    #[test]
    fn cumulative_return_tracks_close_presence(batches in arb_batches()) {
        let dataset = merge(batches);
        let points = compute_returns(&dataset);
        prop_assert_eq!(points.len(), dataset.len());
        for (point, record) in points.iter().zip(&dataset) {
            prop_assert_eq!(point.cumulative_return.is_some(), record.close.is_some());
            if point.daily_change.is_some() {
                prop_assert!(point.cumulative_return.is_some());
            }
        }
    }

    #[test]
    fn pearson_is_bounded_and_symmetric(
        xs in prop::collection::vec(arb_value(), 0..20),
        ys in prop::collection::vec(arb_value(), 0..20),
    ) {
        let r = pearson(&xs, &ys);
        prop_assert_eq!(r, pearson(&ys, &xs));
        if let Some(r) = r {
            prop_assert!((-1.0..=1.0).contains(&r));
        }
    }
}
