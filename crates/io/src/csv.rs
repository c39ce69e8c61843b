// CSV/TSV read and write

use std::io::Read;
use std::path::Path;

use keylink_match::Row;

use crate::error::TableError;
use crate::header::{header_names, text_cell, RowCollector};

/// Read a delimited file. `None` sniffs the delimiter from the content.
pub fn read(path: &Path, delimiter: Option<u8>) -> Result<Vec<Row>, TableError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    let name = path.display().to_string();
    parse(&content, delimiter, &name)
        .map_err(|message| TableError::Parse { path: name.clone(), message })
}

/// Parse delimited text; the first non-blank record is the header.
/// `source` names the input in log messages.
pub fn parse(content: &str, delimiter: u8, source: &str) -> Result<Vec<Row>, String> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut table: Option<RowCollector> = None;

    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        match &mut table {
            None => {
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                table = Some(RowCollector::new(header_names(record.iter().map(str::to_string))));
            }
            Some(rows) => rows.push(record.iter().map(text_cell)),
        }
    }

    Ok(table.map(|rows| rows.finish(source)).unwrap_or_default())
}

/// Delimiter candidates, lowest priority first: on a tie the later one wins.
const DELIMITERS: [u8; 4] = [b'|', b',', b';', b'\t'];

/// Non-blank records inspected when guessing the delimiter.
const SNIFF_RECORDS: usize = 20;

/// Guess the field delimiter from the leading records.
///
/// Each candidate parses the sample as CSV, so quoted delimiters and quoted
/// line breaks are not miscounted. A candidate must split the header into
/// at least two fields; the one with the most body records agreeing with
/// the header width wins, a wider header breaking ties. Defaults to comma.
fn sniff_delimiter(content: &str) -> u8 {
    DELIMITERS
        .iter()
        .filter_map(|&delim| {
            let widths = record_widths(content, delim);
            let (&header, body) = widths.split_first()?;
            if header < 2 {
                return None;
            }
            let agreeing = body.iter().filter(|&&w| w == header).count();
            Some((delim, (agreeing, header)))
        })
        .max_by_key(|&(_, rank)| rank)
        .map_or(b',', |(delim, _)| delim)
}

fn record_widths(content: &str, delimiter: u8) -> Vec<usize> {
    ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .map_while(Result::ok)
        .filter(|record| record.iter().any(|f| !f.trim().is_empty()))
        .take(SNIFF_RECORDS)
        .map(|record| record.len())
        .collect()
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback for Excel-exported CSVs)
pub fn read_file_as_utf8(path: &Path) -> Result<String, TableError> {
    let read_err = |source| TableError::Read { path: path.display().to_string(), source };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    // Strip a UTF-8 BOM so it does not end up in the first header name
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(..3);
    }

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

pub fn write(path: &Path, rows: &[Row], delimiter: u8) -> Result<(), TableError> {
    let write_err = |e: ::csv::Error| TableError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let columns = crate::columns_of(rows);
    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(write_err)?;

    writer.write_record(&columns).map_err(write_err)?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(write_err)?;
    }

    writer.flush().map_err(|e| TableError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}
