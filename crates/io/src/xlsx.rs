// Excel import (xlsx, xlsm, xls, xlsb, ods) and xlsx export

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use keylink_match::{Row, Value};
use log::warn;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::TableError;
use crate::header::{header_names, RowCollector};

/// Excel sheet limits
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Read the first worksheet; its first non-blank row is the header.
pub fn read(path: &Path) -> Result<Vec<Row>, TableError> {
    let parse_err = |message: String| TableError::Parse {
        path: path.display().to_string(),
        message,
    };

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| parse_err(format!("failed to open Excel file: {e}")))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(parse_err("Excel file contains no sheets".into()));
    };
    if workbook.sheet_names().len() > 1 {
        warn!("{}: reading first sheet '{}' only", path.display(), sheet_name);
    }

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| parse_err(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut table: Option<RowCollector> = None;

    for cells in range.rows() {
        match &mut table {
            None => {
                if cells.iter().all(|c| cell_value(c).is_empty()) {
                    continue;
                }
                let headers = header_names(cells.iter().map(|c| cell_value(c).to_string()));
                table = Some(RowCollector::new(headers));
            }
            Some(rows) => rows.push(cells.iter().map(cell_value)),
        }
    }

    Ok(table
        .map(|rows| rows.finish(&path.display().to_string()))
        .unwrap_or_default())
}

/// Convert a calamine cell. Dates stay serial numbers, as spreadsheets store them.
fn cell_value(data: &Data) -> Value {
    match data {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::from(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Write rows to a single-sheet xlsx with a bold header row.
pub fn write(path: &Path, rows: &[Row], sheet: &str) -> Result<(), TableError> {
    let write_err = |e: rust_xlsxwriter::XlsxError| TableError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let columns = crate::columns_of(rows);
    if rows.len() + 1 > MAX_ROWS || columns.len() > MAX_COLS {
        return Err(TableError::TooLarge {
            path: path.display().to_string(),
            rows: rows.len(),
            cols: columns.len(),
        });
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet().set_name(sheet).map_err(write_err)?;
    let header_format = Format::new().set_bold();

    for (c, name) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, c as u16, name, &header_format)
            .map_err(write_err)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, name) in columns.iter().enumerate() {
            let c = c as u16;
            match row.get(name) {
                Some(Value::Number(n)) => {
                    worksheet.write_number(r, c, *n).map_err(write_err)?;
                }
                Some(Value::Text(s)) if !s.is_empty() => {
                    worksheet.write_string(r, c, s).map_err(write_err)?;
                }
                _ => {}
            }
        }
    }

    workbook.save(path).map_err(write_err)?;
    Ok(())
}
