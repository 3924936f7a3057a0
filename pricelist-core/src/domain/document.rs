//! SourceDocument: one input file, identified by its path.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An input document enumerated from the input directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub file_name: String,
    /// Trading date, once the filename has been resolved.
    pub date: Option<NaiveDate>,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            date: None,
        }
    }

    pub fn with_date(self, date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..self
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
