//! Document ingestion: dates, tables, records, merging

pub mod columns;
pub mod date_resolver;
pub mod detect;
pub mod extract;
pub mod layout;
pub mod merge;
pub mod normalize;
pub mod schema;

pub use columns::{ColumnMap, HeaderMapping};
pub use date_resolver::{DateParseError, DateResolver};
pub use detect::{detect_tables, ExtractOptions};
pub use extract::{DocumentFormat, ExtractionError, PageError, TableBlocks, TableExtractor};
pub use merge::{merge, DatasetMerger, LongitudinalDataset, MergeError, MergeStats};
pub use normalize::{
    BlockLayout, DropReason, HeaderSource, NormalizationWarning, NormalizeOptions,
    NormalizedBlock, RecordNormalizer,
};
pub use schema::{DatasetSchema, SchemaError};
