//! Table detection over laid-out page lines.
//!
//! A page arrives as an ordered list of lines, each already split into
//! positioned cells. A table starts at a line with at least `min_columns`
//! cells; its first line is the header. The widest line seen so far anchors
//! the columns: a shorter line is placed cell by cell under the anchor it
//! lines up with, so a blank cell stays blank instead of pulling the values
//! to its right one column over. Titles, footers and section banners are a
//! single cell and therefore separate tables.

use crate::domain::RawTableBlock;
use serde::{Deserialize, Serialize};

/// A run of text on a line, with its horizontal extent.
///
/// Text pages measure extents in character columns, PDF pages in user-space
/// units; only comparisons within one page matter.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCell {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl PageCell {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Overlap with `other`; negative values are the gap between the two.
    fn overlap(&self, other: &PageCell) -> f64 {
        self.end.min(other.end) - self.start.max(other.start)
    }
}

/// One laid-out line of a page: non-empty cells, left to right.
pub type PageLine = Vec<PageCell>;

/// Tuning knobs for detection and layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Minimum cells for a line to start a table.
    pub min_columns: usize,
    /// Minimum lines (header included) for a run to count as a table.
    pub min_rows: usize,
    /// Vertical distance (PDF user-space units) within which text boxes share a line.
    pub line_tolerance: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_columns: 3,
            min_rows: 2,
            line_tolerance: 2.0,
        }
    }
}

/// Detect tables among the lines of one page, in top-to-bottom order.
pub fn detect_tables(page: u32, lines: &[PageLine], options: &ExtractOptions) -> Vec<RawTableBlock> {
    let min_columns = options.min_columns.max(1);
    let min_rows = options.min_rows.max(1);

    let mut blocks = Vec::new();
    let mut run: Option<Run<'_>> = None;

    for line in lines {
        if let Some(current) = run.as_mut() {
            if current.accept(line, min_columns) {
                continue;
            }
        }
        if let Some(done) = run.take() {
            done.finish(page, min_rows, &mut blocks);
        }
        if line.len() >= min_columns {
            run = Some(Run::start(line));
        }
    }
    if let Some(done) = run {
        done.finish(page, min_rows, &mut blocks);
    }

    blocks
}

/// Lines of the table being collected, already placed into columns.
struct Run<'a> {
    anchors: &'a PageLine,
    lines: Vec<Vec<String>>,
}

impl<'a> Run<'a> {
    fn start(line: &'a PageLine) -> Self {
        Self {
            anchors: line,
            lines: vec![texts(line)],
        }
    }

    /// Add `line` to the run if it belongs to the table.
    fn accept(&mut self, line: &'a PageLine, min_columns: usize) -> bool {
        if line.len() >= self.anchors.len() {
            if line.len() > self.anchors.len() {
                self.anchors = line;
            }
            self.lines.push(texts(line));
            return true;
        }
        // A lone cell is a banner or footer, never a sparse row.
        if line.len() >= 2.min(min_columns) {
            if let Some(placed) = place(self.anchors, line) {
                self.lines.push(placed);
                return true;
            }
        }
        if line.len() >= min_columns {
            self.lines.push(texts(line));
            return true;
        }
        false
    }

    fn finish(self, page: u32, min_rows: usize, blocks: &mut Vec<RawTableBlock>) {
        if self.lines.len() < min_rows {
            return;
        }
        let mut lines = self.lines.into_iter();
        let header = lines.next().unwrap_or_default();
        blocks.push(RawTableBlock::new(page, blocks.len(), header, lines.collect()));
    }
}

fn texts(line: &PageLine) -> Vec<String> {
    line.iter().map(|cell| cell.text.clone()).collect()
}

/// Put each cell of a short line under the anchor it overlaps most (or lies
/// closest to). `None` when two cells land on the same anchor or out of order.
fn place(anchors: &PageLine, line: &PageLine) -> Option<Vec<String>> {
    let mut placed = vec![String::new(); anchors.len()];
    let mut previous: Option<usize> = None;
    for cell in line {
        let column = anchors
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |best, (i, anchor)| {
                let score = cell.overlap(anchor);
                if score > best.1 {
                    (i, score)
                } else {
                    best
                }
            })
            .0;
        if previous.is_some_and(|p| column <= p) {
            return None;
        }
        placed[column] = cell.text.clone();
        previous = Some(column);
    }
    Some(placed)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cells at explicit character columns.
    fn at(cells: &[(usize, &str)]) -> PageLine {
        cells
            .iter()
            .map(|(start, text)| {
                let start = *start as f64;
                PageCell::new(start, start + text.chars().count() as f64, *text)
            })
            .collect()
    }

    /// Cells laid out on a regular 12-column grid.
    fn line(cells: &[&str]) -> PageLine {
        let placed: Vec<(usize, &str)> = cells.iter().enumerate().map(|(i, c)| (i * 12, *c)).collect();
        at(&placed)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_table_with_title_and_footer() {
        let lines = vec![
            line(&["NIGERIAN EXCHANGE DAILY PRICE LIST"]),
            line(&["Symbol", "Close", "Volume"]),
            line(&["ABC", "10.00", "1,000"]),
            line(&["XYZ", "5.50", "200"]),
            line(&["Page 1 of 3"]),
        ];
        let blocks = detect_tables(1, &lines, &ExtractOptions::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].header, strings(&["Symbol", "Close", "Volume"]));
        assert_eq!(blocks[0].height(), 2);
        assert_eq!(blocks[0].page, 1);
    }

    #[test]
    fn banner_between_tables_yields_two_blocks() {
        let lines = vec![
            line(&["Symbol", "Close", "Volume"]),
            line(&["ABC", "10.00", "1,000"]),
            line(&["ETF BOARD"]),
            line(&["Ticker", "Closing Price", "Vol"]),
            line(&["ETF1", "120", "5"]),
        ];
        let blocks = detect_tables(4, &lines, &ExtractOptions::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].index_on_page, 0);
        assert_eq!(blocks[1].index_on_page, 1);
        assert_eq!(blocks[1].header[0], "Ticker");
    }

    #[test]
    fn header_only_run_is_not_a_table() {
        let lines = vec![line(&["Symbol", "Close", "Volume"]), line(&["end"])];
        assert!(detect_tables(1, &lines, &ExtractOptions::default()).is_empty());
    }

    #[test]
    fn page_without_tabular_lines_yields_nothing() {
        let lines = vec![line(&["Market commentary"]), line(&["Prices rose", "today"])];
        assert!(detect_tables(1, &lines, &ExtractOptions::default()).is_empty());
    }

    #[test]
    fn blank_middle_cell_keeps_later_columns_in_place() {
        //          0         10        20        30
        let lines = vec![
            at(&[(0, "Symbol"), (10, "Open"), (20, "Close"), (30, "Volume")]),
            at(&[(0, "ABC"), (20, "10.00"), (30, "1,000")]),
        ];
        let blocks = detect_tables(1, &lines, &ExtractOptions::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].rows[0], strings(&["ABC", "", "10.00", "1,000"]));
    }

    #[test]
    fn sparse_rows_stay_in_the_table() {
        let lines = vec![
            at(&[(0, "Symbol"), (12, "Close"), (24, "Volume")]),
            at(&[(0, "ABC"), (12, "10.00")]),
            at(&[(0, "XYZ"), (12, "4.05"), (24, "25,000")]),
            at(&[(0, "QRS"), (12, "1.10"), (24, "300")]),
        ];
        let blocks = detect_tables(1, &lines, &ExtractOptions::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].height(), 3);
        assert_eq!(blocks[0].rows[0], strings(&["ABC", "10.00", ""]));
        assert_eq!(blocks[0].rows[2], strings(&["QRS", "1.10", "300"]));
    }

    #[test]
    fn right_aligned_numbers_find_their_header() {
        let lines = vec![
            at(&[(0, "Symbol"), (14, "Close"), (26, "Volume")]),
            at(&[(0, "ABC"), (26, "10,000")]),
            at(&[(0, "XYZ"), (13, "123.45"), (28, "7")]),
        ];
        let blocks = detect_tables(1, &lines, &ExtractOptions::default());
        assert_eq!(blocks[0].rows[0], strings(&["ABC", "", "10,000"]));
        assert_eq!(blocks[0].rows[1], strings(&["XYZ", "123.45", "7"]));
    }

    #[test]
    fn wider_line_takes_over_as_anchor() {
        let lines = vec![
            at(&[(0, "NIGERIAN EXCHANGE"), (24, "DAILY"), (36, "PRICE LIST")]),
            at(&[(0, "Symbol"), (10, "Open"), (20, "High"), (30, "Close"), (40, "Volume")]),
            at(&[(0, "ABC"), (30, "10.00"), (40, "500")]),
        ];
        let blocks = detect_tables(1, &lines, &ExtractOptions::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].width(), 5);
        assert_eq!(blocks[0].rows[1], strings(&["ABC", "", "", "10.00", "500"]));
    }

    #[test]
    fn min_columns_is_configurable() {
        let lines = vec![line(&["Symbol", "Close"]), line(&["ABC", "10"])];
        let options = ExtractOptions {
            min_columns: 2,
            ..ExtractOptions::default()
        };
        assert_eq!(detect_tables(1, &lines, &options).len(), 1);
    }
}
