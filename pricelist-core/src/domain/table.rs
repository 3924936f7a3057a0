//! RawTableBlock: an untyped grid of string cells found on a page.

/// A rectangular grid of string cells extracted from one document.
///
/// The header and every body row have exactly `width()` cells: the block is
/// as wide as its widest line and shorter lines are padded with empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTableBlock {
    /// 1-based page number the block was detected on.
    pub page: u32,
    /// Position of the block among the blocks of its page.
    pub index_on_page: usize,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTableBlock {
    pub fn new(
        page: u32,
        index_on_page: usize,
        mut header: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        let width = rows.iter().map(Vec::len).fold(header.len(), usize::max);
        header.resize(width, String::new());
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            page,
            index_on_page,
            header,
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}
