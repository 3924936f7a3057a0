//! Pricelist Core: document ingestion, normalization, merging and analytics.
//!
//! This crate turns a pile of daily price-list documents into one dataset:
//! - Trading dates resolved from document filenames
//! - Table blocks extracted page by page from PDF or text layouts
//! - Heterogeneous tables normalized into canonical stock records
//! - Records merged into a (date × company) longitudinal dataset
//! - Returns, aggregates and correlations computed over that dataset

pub mod analytics;
pub mod data;
pub mod domain;
