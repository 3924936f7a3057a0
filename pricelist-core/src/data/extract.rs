//! Table extraction from price-list documents.
//!
//! `TableExtractor::open` validates and loads a document, then hands back a
//! `TableBlocks` iterator that lays out and scans one page at a time. The
//! iterator owns the document handle: it is finite, cannot be restarted, and
//! the handle is released when it is dropped.
//!
//! A page whose content cannot be decoded is logged and skipped; only a
//! document that cannot be opened at all is an error.

use super::detect::{detect_tables, ExtractOptions, PageLine};
use super::layout::{lines_from_content, text_page_lines};
use crate::domain::RawTableBlock;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Document-level extraction failure. The whole document is skipped.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported document format for {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("{path} is not a valid PDF: {reason}")]
    InvalidPdf { path: PathBuf, reason: String },
}

/// Page-level failure. Recovered locally: the page contributes no blocks.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page {page}: cannot decode content stream: {reason}")]
    Content { page: u32, reason: String },
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    /// Plain-text layout dump, pages separated by form feed.
    Text,
}

impl DocumentFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" => Some(DocumentFormat::Text),
            _ => None,
        }
    }
}

/// Opens documents and yields their tables.
#[derive(Debug, Clone, Default)]
pub struct TableExtractor {
    options: ExtractOptions,
}

impl TableExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Open a document and return a lazy sequence of its tables, in page order.
    pub fn open(&self, path: &Path) -> Result<TableBlocks, ExtractionError> {
        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            ExtractionError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
        })?;

        let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let source = match format {
            DocumentFormat::Pdf => {
                if !is_pdf_magic(&bytes) {
                    return Err(ExtractionError::InvalidPdf {
                        path: path.to_path_buf(),
                        reason: "missing %PDF header".into(),
                    });
                }
                let doc = Document::load_mem(&bytes).map_err(|e| ExtractionError::InvalidPdf {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
                PageSource::pdf(doc)
            }
            DocumentFormat::Text => {
                let text = String::from_utf8_lossy(&bytes);
                PageSource::text(&text)
            }
        };

        tracing::debug!(path = %path.display(), pages = source.page_count(), "opened document");

        Ok(TableBlocks {
            source,
            options: self.options.clone(),
            pending: VecDeque::new(),
            failed_pages: Vec::new(),
        })
    }

    /// Convenience: open and drain every table of a document.
    pub fn extract_all(&self, path: &Path) -> Result<Vec<RawTableBlock>, ExtractionError> {
        Ok(self.open(path)?.collect())
    }
}

/// Per-format page cursor.
enum PageSource {
    Pdf {
        doc: Document,
        pages: std::vec::IntoIter<(u32, ObjectId)>,
        count: usize,
    },
    Text {
        pages: std::vec::IntoIter<(u32, String)>,
        count: usize,
    },
}

impl PageSource {
    fn pdf(doc: Document) -> Self {
        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        let count = pages.len();
        PageSource::Pdf {
            doc,
            pages: pages.into_iter(),
            count,
        }
    }

    fn text(text: &str) -> Self {
        let pages: Vec<(u32, String)> = text
            .split('\x0C')
            .enumerate()
            .map(|(i, page)| (i as u32 + 1, page.to_string()))
            .collect();
        let count = pages.len();
        PageSource::Text {
            pages: pages.into_iter(),
            count,
        }
    }

    fn page_count(&self) -> usize {
        match self {
            PageSource::Pdf { count, .. } | PageSource::Text { count, .. } => *count,
        }
    }

    /// Lay out the next page. `None` once every page has been visited.
    fn next_page(&mut self, tolerance: f64) -> Option<(u32, Result<Vec<PageLine>, PageError>)> {
        match self {
            PageSource::Pdf { doc, pages, .. } => {
                let (number, id) = pages.next()?;
                let lines = decode_page(doc, number, id)
                    .map(|content| lines_from_content(&content, tolerance));
                Some((number, lines))
            }
            PageSource::Text { pages, .. } => {
                let (number, text) = pages.next()?;
                Some((number, Ok(text_page_lines(&text))))
            }
        }
    }
}

/// Decode every content stream of a page.
///
/// `Document::get_and_decode_page_content` skips streams it cannot resolve
/// and passes undecodable data through raw, which turns a broken page into
/// an empty one. Each stream is resolved and decompressed here instead, so
/// any failure surfaces as a `PageError`.
fn decode_page(doc: &Document, page: u32, id: ObjectId) -> Result<Content, PageError> {
    let fail = |reason: String| PageError::Content { page, reason };

    let mut data = Vec::new();
    for stream_id in doc.get_page_contents(id) {
        let stream = doc
            .get_object(stream_id)
            .and_then(Object::as_stream)
            .map_err(|e| fail(format!("content stream {} {}: {e}", stream_id.0, stream_id.1)))?;
        if stream.dict.has(b"Filter") {
            let decoded = stream
                .decompressed_content()
                .map_err(|e| fail(format!("content stream {} {}: {e}", stream_id.0, stream_id.1)))?;
            // Some decoders log and yield nothing on corrupt input.
            if decoded.is_empty() && !stream.content.is_empty() {
                return Err(fail(format!(
                    "content stream {} {}: filtered data decoded to nothing",
                    stream_id.0, stream_id.1
                )));
            }
            data.extend_from_slice(&decoded);
        } else {
            data.extend_from_slice(&stream.content);
        }
        // Streams are concatenated; keep operators from running together.
        data.push(b'\n');
    }
    Content::decode(&data).map_err(|e| fail(e.to_string()))
}

/// Lazy, single-pass sequence of tables found in one opened document.
pub struct TableBlocks {
    source: PageSource,
    options: ExtractOptions,
    pending: VecDeque<RawTableBlock>,
    failed_pages: Vec<PageError>,
}

impl TableBlocks {
    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    /// Pages skipped so far because their content could not be laid out.
    pub fn failed_pages(&self) -> &[PageError] {
        &self.failed_pages
    }
}

impl Iterator for TableBlocks {
    type Item = RawTableBlock;

    fn next(&mut self) -> Option<RawTableBlock> {
        loop {
            if let Some(block) = self.pending.pop_front() {
                return Some(block);
            }
            let (page, lines) = self.source.next_page(self.options.line_tolerance)?;
            match lines {
                Ok(lines) => {
                    let blocks = detect_tables(page, &lines, &self.options);
                    tracing::debug!(page, tables = blocks.len(), "scanned page");
                    self.pending.extend(blocks);
                }
                Err(error) => {
                    tracing::warn!(%error, "skipping page");
                    self.failed_pages.push(error);
                }
            }
        }
    }
}

/// PDF magic: `%PDF` after an optional BOM or leading whitespace.
fn is_pdf_magic(bytes: &[u8]) -> bool {
    let trimmed: Vec<u8> = bytes
        .iter()
        .skip_while(|&&b| b == 0xEF || b == 0xBB || b == 0xBF || b.is_ascii_whitespace())
        .take(4)
        .copied()
        .collect();
    trimmed.starts_with(b"%PDF")
}
