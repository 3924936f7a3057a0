//! Page layout: turning raw page content into lines of cells.
//!
//! Two sources are supported:
//! - plain-text layout dumps, where columns are separated by runs of
//!   whitespace (`split_text_line`);
//! - PDF content streams, where text-showing operators are positioned by the
//!   text matrix and grouped into lines by y-coordinate (`lines_from_content`).

use super::detect::{PageCell, PageLine};
use lopdf::content::Content;
use lopdf::Object;

const TAB_STOP: usize = 8;

/// Nominal glyph advance (user-space units) for cells split out of one PDF
/// text run, and for the width of every PDF cell.
const NOMINAL_ADVANCE: f64 = 5.0;

/// Split one text line into cells on runs of two or more spaces, or tabs.
/// Cell extents are character columns, tabs expanded to 8-column stops.
pub fn split_text_line(line: &str) -> PageLine {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    let mut end = 0usize;
    let mut spaces = 0usize;
    let mut column = 0usize;

    for ch in line.chars() {
        match ch {
            '\t' => {
                spaces = 2;
                column = (column / TAB_STOP + 1) * TAB_STOP;
                continue;
            }
            ' ' => spaces += 1,
            _ => {
                if spaces >= 2 && !current.is_empty() {
                    cells.push(PageCell::new(start as f64, end as f64, std::mem::take(&mut current)));
                } else if spaces == 1 && !current.is_empty() {
                    current.push(' ');
                }
                if current.is_empty() {
                    start = column;
                }
                spaces = 0;
                current.push(ch);
                end = column + 1;
            }
        }
        column += 1;
    }
    if !current.is_empty() {
        cells.push(PageCell::new(start as f64, end as f64, current));
    }
    cells
}

/// Lay out a text page: one `PageLine` per non-blank line.
pub fn text_page_lines(page: &str) -> Vec<PageLine> {
    page.lines()
        .map(split_text_line)
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// A run of text placed at a point on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Text-state tracker for a single content stream.
///
/// Only translation is tracked: scaling, rotation and the CTM (`cm`) are
/// ignored, which is enough for generated price-list reports.
#[derive(Debug, Default)]
struct TextCursor {
    line_x: f64,
    line_y: f64,
    leading: f64,
}

impl TextCursor {
    fn begin(&mut self) {
        self.line_x = 0.0;
        self.line_y = 0.0;
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.line_x += tx;
        self.line_y += ty;
    }

    fn next_line(&mut self) {
        self.line_y -= self.leading;
    }
}

/// Collect positioned text boxes from a decoded content stream.
pub fn text_boxes(content: &Content) -> Vec<TextBox> {
    let mut cursor = TextCursor::default();
    let mut boxes: Vec<TextBox> = Vec::new();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => cursor.begin(),
            "Tm" => {
                if let (Some(x), Some(y)) = (number(operands.get(4)), number(operands.get(5))) {
                    cursor.line_x = x;
                    cursor.line_y = y;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (number(operands.first()), number(operands.get(1))) {
                    cursor.translate(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands.first()), number(operands.get(1))) {
                    cursor.leading = -ty;
                    cursor.translate(tx, ty);
                }
            }
            "TL" => {
                if let Some(leading) = number(operands.first()) {
                    cursor.leading = leading;
                }
            }
            "T*" => cursor.next_line(),
            "Tj" => push_text(&mut boxes, &cursor, operands.first().map(show_text)),
            "TJ" => push_text(&mut boxes, &cursor, operands.first().map(show_array)),
            "'" => {
                cursor.next_line();
                push_text(&mut boxes, &cursor, operands.first().map(show_text));
            }
            "\"" => {
                cursor.next_line();
                push_text(&mut boxes, &cursor, operands.get(2).map(show_text));
            }
            _ => {}
        }
    }

    boxes
}

/// Group text boxes into lines (top of page first), cells ordered left to right.
pub fn group_lines(mut boxes: Vec<TextBox>, tolerance: f64) -> Vec<PageLine> {
    boxes.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<(f64, Vec<TextBox>)> = Vec::new();
    for text_box in boxes {
        match lines.last_mut() {
            Some((anchor, members)) if (*anchor - text_box.y).abs() <= tolerance => {
                members.push(text_box);
            }
            _ => lines.push((text_box.y, vec![text_box])),
        }
    }

    lines
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| a.x.total_cmp(&b.x));
            members
                .iter()
                .flat_map(|member| {
                    split_text_line(&member.text).into_iter().map(|cell| {
                        PageCell::new(
                            member.x + cell.start * NOMINAL_ADVANCE,
                            member.x + cell.end * NOMINAL_ADVANCE,
                            cell.text,
                        )
                    })
                })
                .collect::<PageLine>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Lay out a decoded PDF page content stream.
pub fn lines_from_content(content: &Content, tolerance: f64) -> Vec<PageLine> {
    group_lines(text_boxes(content), tolerance)
}

fn push_text(boxes: &mut Vec<TextBox>, cursor: &TextCursor, text: Option<String>) {
    let Some(text) = text else { return };
    if text.trim().is_empty() {
        return;
    }
    // Consecutive shows without repositioning continue the same run.
    if let Some(last) = boxes.last_mut() {
        if last.x == cursor.line_x && last.y == cursor.line_y {
            last.text.push_str(&text);
            return;
        }
    }
    boxes.push(TextBox {
        x: cursor.line_x,
        y: cursor.line_y,
        text,
    });
}

fn number(obj: Option<&Object>) -> Option<f64> {
    match obj? {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Decode a string operand. Price lists use simple single-byte fonts, so
/// bytes are read as UTF-8 when valid and Latin-1 otherwise.
fn show_text(obj: &Object) -> String {
    match obj {
        Object::String(bytes, _) => decode_bytes(bytes),
        _ => String::new(),
    }
}

/// `TJ` arrays interleave strings with kerning offsets; a large negative
/// offset is a visual word gap.
fn show_array(obj: &Object) -> String {
    let Object::Array(items) = obj else {
        return show_text(obj);
    };
    let mut text = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => text.push_str(&decode_bytes(bytes)),
            other => {
                if number(Some(other)).is_some_and(|offset| offset <= -200.0) {
                    text.push(' ');
                }
            }
        }
    }
    text
}

fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
