//! Plain-text tables of flat records and report rows.
//!
//! Record columns come from the mapping table's descriptor, so output
//! follows the operator's field order. Widths are measured with `unicode-width` so CJK
//! and emoji cells stay aligned.

use crate::model::{ClosureSet, FlatRecord};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const COLUMN_GAP: &str = "  ";
const MIN_COLUMN_WIDTH: usize = 4;

/// Terminal width from `COLUMNS`, defaulting to 80.
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.trim().parse::<usize>().ok())
        .filter(|&value| value > 0)
        .unwrap_or(80)
}

/// Truncate `text` to `max_len` visible columns, ending in `...` when cut.
#[must_use]
pub fn truncate(text: &str, max_len: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_len {
        return text.to_string();
    }
    let (budget, ellipsis) = if max_len > 3 { (max_len - 3, "...") } else { (max_len, "") };

    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > budget {
            break;
        }
        width += cw;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{text}{}", " ".repeat(fill))
}

fn cell_text(record: &FlatRecord, key: &str) -> String {
    record.get(key).map(ToString::to_string).unwrap_or_default()
}

/// Render records as an aligned table.
///
/// `columns` is `(record key, header)`; columns no record has a value for
/// are left out. The widest columns shrink first when the table does not fit
/// in `max_width`.
#[must_use]
pub fn render_table(columns: &[(&str, &str)], records: &ClosureSet, max_width: usize) -> String {
    let visible: Vec<(&str, &str)> = columns
        .iter()
        .copied()
        .filter(|(key, _)| records.values().any(|record| record.contains_key(key)))
        .collect();
    if visible.is_empty() {
        return String::new();
    }

    let rows: Vec<Vec<String>> = records
        .values()
        .map(|record| visible.iter().map(|(key, _)| cell_text(record, key)).collect())
        .collect();
    let headers: Vec<&str> = visible.iter().map(|(_, header)| *header).collect();
    render_rows(&headers, &rows, max_width)
}

/// Render pre-formatted rows under `headers`, shrinking the widest columns
/// to fit `max_width`.
#[must_use]
pub fn render_rows(headers: &[&str], rows: &[Vec<String>], max_width: usize) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| UnicodeWidthStr::width(cell.as_str()))
                .chain(std::iter::once(UnicodeWidthStr::width(*header)))
                .max()
                .unwrap_or(0)
        })
        .collect();
    shrink_to_fit(&mut widths, max_width);

    let mut out = render_line(headers, &widths);
    out.push('\n');
    for row in rows {
        out.push_str(&render_line(row, &widths));
        out.push('\n');
    }
    out
}

fn render_line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| {
            let flat = cell.as_ref().replace(['\n', '\r'], " ");
            pad(&truncate(&flat, width), width)
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

fn shrink_to_fit(widths: &mut [usize], max_width: usize) {
    let gaps = COLUMN_GAP.len() * widths.len().saturating_sub(1);
    while widths.iter().sum::<usize>() + gaps > max_width {
        let Some(widest) = widths
            .iter_mut()
            .filter(|w| **w > MIN_COLUMN_WIDTH)
            .max_by_key(|w| **w)
        else {
            break;
        };
        *widest -= 1;
    }
}
