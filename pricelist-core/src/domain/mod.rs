//! Domain types for price-list ingestion

pub mod document;
pub mod record;
pub mod table;

pub use document::SourceDocument;
pub use record::{CanonicalColumn, StockRecord};
pub use table::RawTableBlock;

/// Company identifier type alias
pub type Symbol = String;
