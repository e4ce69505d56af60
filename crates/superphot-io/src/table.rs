//! Fixed-width text tables: the bordered results layout and the two-line
//! (header, dash rule, rows) sweep layout.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_json::Value;
use superphot_classify::SweepRecord;
use tracing::{info, instrument, warn};

use crate::IoError;

fn column_widths(header: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .map(|(c, name)| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn pad_row(cells: &[String], widths: &[usize]) -> Vec<String> {
    widths
        .iter()
        .enumerate()
        .map(|(c, &w)| format!("{:>w$}", cells.get(c).map_or("", String::as_str)))
        .collect()
}

/// Render a `|`-bordered table with a single header line.
#[must_use]
pub fn format_bordered(header: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(header, rows);
    let mut out = String::new();
    for cells in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        out.push_str("| ");
        out.push_str(&pad_row(cells, &widths).join(" | "));
        out.push_str(" |\n");
    }
    out
}

/// Render a table as a header line, a dash rule marking each column's span,
/// then the rows.
#[must_use]
pub fn format_two_line(header: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(header, rows);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let mut out = String::new();
    out.push_str(&pad_row(header, &widths).join(" "));
    out.push('\n');
    out.push_str(&rule.join(" "));
    out.push('\n');
    for row in rows {
        out.push_str(pad_row(row, &widths).join(" ").trim_end());
        out.push('\n');
    }
    out
}

/// Parse a two-line table back into its header and trimmed cells.
///
/// Column spans come from the runs of `-` on the second line.
///
/// # Errors
///
/// Returns [`IoError::MalformedTable`] when the header or rule is missing
/// or the header does not fit the rule.
pub fn parse_two_line(path: &Path, text: &str) -> Result<(Vec<String>, Vec<Vec<String>>), IoError> {
    let malformed = |line: usize, reason: &str| IoError::MalformedTable {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    };

    let mut lines = text.lines();
    let header_line: Vec<char> = lines.next().ok_or_else(|| malformed(1, "missing header"))?.chars().collect();
    let rule = lines.next().ok_or_else(|| malformed(2, "missing dash rule"))?;

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut start = None;
    for (i, ch) in rule.chars().chain(std::iter::once(' ')).enumerate() {
        match (ch, start) {
            ('-', None) => start = Some(i),
            ('-', Some(_)) => {}
            (' ', Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            (' ', None) => {}
            _ => return Err(malformed(2, "rule may only contain '-' and spaces")),
        }
    }
    if spans.is_empty() {
        return Err(malformed(2, "empty dash rule"));
    }

    let cut = |chars: &[char], (s, e): (usize, usize)| -> String {
        chars
            .get(s.min(chars.len())..e.min(chars.len()))
            .map(|cs| cs.iter().collect::<String>().trim().to_string())
            .unwrap_or_default()
    };

    let header: Vec<String> = spans.iter().map(|&span| cut(&header_line, span)).collect();
    if header.iter().any(String::is_empty) {
        return Err(malformed(1, "header name outside of its column"));
    }

    let rows = lines
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let chars: Vec<char> = line.chars().collect();
            spans.iter().map(|&span| cut(&chars, span)).collect()
        })
        .collect();
    Ok((header, rows))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(cell) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
        _ => Value::String(cell.to_string()),
    }
}

/// Read a sweep results table written by [`write_sweep_table`].
///
/// Empty cells are omitted from the record, numbers and booleans are
/// parsed back, everything else stays a string.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::MalformedTable`] | Not a two-line table |
pub fn read_sweep_table(path: &Path) -> Result<Vec<SweepRecord>, IoError> {
    let text = fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let (header, rows) = parse_two_line(path, &text)?;
    Ok(rows
        .into_iter()
        .map(|cells| {
            header
                .iter()
                .zip(cells)
                .filter(|(_, cell)| !cell.is_empty())
                .map(|(name, cell)| (name.clone(), cell_value(&cell)))
                .collect()
        })
        .collect())
}

/// Write sweep records as a two-line table whose columns are the sorted
/// union of all record keys.
///
/// With `append`, rows already at `path` are kept ahead of the new ones.
/// Returns the total number of rows written.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::MalformedTable`] | `append` and the existing file cannot be parsed |
/// | [`IoError::WriteFile`] | File cannot be written |
#[instrument(skip(records), fields(path = %path.display(), n_new = records.len()))]
pub fn write_sweep_table(path: &Path, records: &[SweepRecord], append: bool) -> Result<usize, IoError> {
    let mut all: Vec<SweepRecord> = Vec::new();
    if append && path.exists() {
        let previous = read_sweep_table(path)?;
        warn!(n_previous = previous.len(), "appending to existing results table");
        all.extend(previous);
    }
    all.extend(records.iter().cloned());

    let header: Vec<String> = all
        .iter()
        .flat_map(|r| r.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let rows: Vec<Vec<String>> = all
        .iter()
        .map(|r| header.iter().map(|k| r.get(k).map(cell_text).unwrap_or_default()).collect())
        .collect();

    fs::write(path, format_two_line(&header, &rows)).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(n_rows = all.len(), "sweep table written");
    Ok(all.len())
}
