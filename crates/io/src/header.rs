// Header row handling shared by the CSV and Excel readers

use std::collections::HashSet;

use keylink_match::{Row, Value};
use log::warn;

const BLANK_HEADER: &str = "__EMPTY";

/// Make header names usable as row keys: blank names become `__EMPTY`,
/// repeats get `_1`, `_2`… suffixes.
pub fn header_names<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::new();

    for name in raw {
        let base = if name.trim().is_empty() { BLANK_HEADER.to_string() } else { name };
        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        if candidate != base && base != BLANK_HEADER {
            warn!("duplicate column '{base}' renamed to '{candidate}'");
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

/// Data rows gathered under a header row. Rows with no data are dropped
/// and counted, and the count is logged once when the table is finished.
pub struct RowCollector {
    headers: Vec<String>,
    rows: Vec<Row>,
    blank_rows: usize,
}

impl RowCollector {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new(), blank_rows: 0 }
    }

    pub fn push<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Value>,
    {
        match build_row(&self.headers, cells) {
            Some(row) => self.rows.push(row),
            None => self.blank_rows += 1,
        }
    }

    pub fn blank_rows(&self) -> usize {
        self.blank_rows
    }

    pub fn finish(self, source: &str) -> Vec<Row> {
        if self.blank_rows > 0 {
            warn!("{source}: skipped {} blank row(s)", self.blank_rows);
        }
        self.rows
    }
}

/// Pair cells with headers. Returns `None` for a row with no data.
/// Cells past the last header are dropped; missing trailing cells are empty.
fn build_row<I>(headers: &[String], cells: I) -> Option<Row>
where
    I: IntoIterator<Item = Value>,
{
    let mut row = Row::with_capacity(headers.len());
    let mut cells = cells.into_iter();
    let mut any = false;
    for header in headers {
        let value = cells.next().unwrap_or(Value::Empty);
        any |= !value.is_empty();
        row.insert(header.clone(), value);
    }
    any.then_some(row)
}

/// A CSV cell: text, with the empty string read as no value.
pub fn text_cell(s: &str) -> Value {
    if s.is_empty() {
        Value::Empty
    } else {
        Value::Text(s.to_string())
    }
}
