use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("{path}: unsupported file type (expected csv, tsv, xlsx, xlsm, xls, xlsb or ods)")]
    UnsupportedFormat { path: String },

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("cannot write {path}: {message}")]
    Write { path: String, message: String },

    #[error("{path}: {rows} rows x {cols} columns exceed the xlsx sheet limit")]
    TooLarge { path: String, rows: usize, cols: usize },
}
