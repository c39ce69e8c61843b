// Table loading and writing for match jobs

pub mod csv;
pub mod error;
pub mod header;
pub mod xlsx;

use std::path::Path;

use indexmap::IndexSet;
use keylink_match::Row;
use log::info;

pub use error::TableError;

/// A loaded file: its display name and rows. No rows means no data.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Delimiter sniffed from content.
    Csv,
    Tsv,
    /// Anything calamine opens; written as xlsx.
    Excel,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load the first sheet (or the whole CSV) as header-keyed rows.
pub fn load_table(path: &Path) -> Result<Table, TableError> {
    let format = TableFormat::from_path(path).ok_or_else(|| TableError::UnsupportedFormat {
        path: path.display().to_string(),
    })?;
    let rows = match format {
        TableFormat::Csv => csv::read(path, None)?,
        TableFormat::Tsv => csv::read(path, Some(b'\t'))?,
        TableFormat::Excel => xlsx::read(path)?,
    };
    let name = display_name(path);
    info!("read {} rows from {}", rows.len(), name);
    Ok(Table { name, rows })
}

/// Write rows as a table. `sheet` names the worksheet for xlsx output.
pub fn write_table(path: &Path, rows: &[Row], sheet: &str) -> Result<(), TableError> {
    let unsupported = || TableError::UnsupportedFormat { path: path.display().to_string() };
    let format = TableFormat::from_path(path).ok_or_else(unsupported)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match format {
        TableFormat::Csv => csv::write(path, rows, b',')?,
        TableFormat::Tsv => csv::write(path, rows, b'\t')?,
        TableFormat::Excel if ext == "xlsx" => xlsx::write(path, rows, sheet)?,
        TableFormat::Excel => return Err(unsupported()),
    }
    info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Union of row keys in first-seen order; the header of a written table.
pub fn columns_of(rows: &[Row]) -> Vec<String> {
    let mut columns: IndexSet<&str> = IndexSet::new();
    for row in rows {
        columns.extend(row.keys().map(String::as_str));
    }
    columns.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylink_match::Value;

    #[test]
    fn format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a.CSV")), Some(TableFormat::Csv));
        assert_eq!(TableFormat::from_path(Path::new("a.tsv")), Some(TableFormat::Tsv));
        assert_eq!(TableFormat::from_path(Path::new("a.ods")), Some(TableFormat::Excel));
        assert_eq!(TableFormat::from_path(Path::new("a.pdf")), None);
        assert_eq!(TableFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn columns_union_in_first_seen_order() {
        let mut a = Row::new();
        a.insert("Key".into(), Value::from("1"));
        a.insert("Name".into(), Value::from("x"));
        let mut b = Row::new();
        b.insert("Key".into(), Value::from("2"));
        b.insert("Extra".into(), Value::from("y"));
        assert_eq!(columns_of(&[a, b]), vec!["Key", "Name", "Extra"]);
    }

    #[test]
    fn writing_legacy_excel_is_refused() {
        let err = write_table(Path::new("out.xls"), &[], "Results").unwrap_err();
        assert!(matches!(err, TableError::UnsupportedFormat { .. }));
    }
}
