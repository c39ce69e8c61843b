use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cells and rows
// ---------------------------------------------------------------------------

/// A scalar cell value as produced by the table loader.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

static EMPTY: Value = Value::Empty;

impl Value {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Text identity of the value. Confirmations and merge lookups are keyed
    /// by this, so `12` (number) and `"12"` (text) are the same key.
    pub fn key_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format!("{n}"),
            Self::Empty => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Ordered mapping from column name to value. Insertion order is the
/// column order of the originating table.
pub type Row = IndexMap<String, Value>;

/// Read a column, treating a missing column as empty.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&EMPTY)
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// A loaded table. Rows are shared (`Arc`) with every candidate and result
/// that references them; a re-upload replaces the dataset, never its rows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Arc<Row>>,
}

impl Dataset {
    /// Build a dataset; the first row's keys define the columns.
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            name: name.into(),
            columns,
            rows: rows.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// The authoritative dataset plus its key column.
#[derive(Debug, Clone, Default)]
pub struct Master {
    pub dataset: Dataset,
    pub key_field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source #{}", self.0)
    }
}

/// An auxiliary dataset supplying candidates and the fields to copy.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: SourceId,
    pub dataset: Dataset,
    pub key_field: String,
    pub mapped_fields: Vec<String>,
}

impl Source {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            dataset: Dataset::default(),
            key_field: String::new(),
            mapped_fields: Vec::new(),
        }
    }

    /// A source takes part in matching only once it has rows, a key column
    /// and at least one mapped field.
    pub fn is_active(&self) -> bool {
        !self.dataset.is_empty() && !self.key_field.is_empty() && !self.mapped_fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Candidates and results
// ---------------------------------------------------------------------------

/// A scored potential match between one master key and one source row.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source_id: SourceId,
    pub row_index: usize,
    pub row: Arc<Row>,
    pub key: Value,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Auto,
    Review,
    #[serde(rename = "nomatch")]
    NoMatch,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Review => "review",
            Self::NoMatch => "nomatch",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "review" => Ok(Self::Review),
            "nomatch" | "no_match" => Ok(Self::NoMatch),
            other => Err(format!("unknown status '{other}' (expected auto, review or nomatch)")),
        }
    }
}

/// Which ranked alternative a reviewer picked over the best match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    Second,
    Third,
}

impl Alternative {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Third => "third",
        }
    }
}

/// The outcome for one master row.
///
/// For ranked results `best_match.score >= match2.score >= match3.score`.
/// Once a reviewer picks an alternative (`overridden`), `best_match` is
/// whatever they chose and the ordering no longer holds.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub master_index: usize,
    pub master_row: Arc<Row>,
    pub master_key: Value,
    pub best_match: Candidate,
    pub match2: Option<Candidate>,
    pub match3: Option<Candidate>,
    pub status: MatchStatus,
    pub confirmed: bool,
    pub overridden: bool,
}

impl MatchResult {
    pub fn key_text(&self) -> String {
        self.master_key.key_text()
    }

    pub fn alternative(&self, alt: Alternative) -> Option<&Candidate> {
        match alt {
            Alternative::Second => self.match2.as_ref(),
            Alternative::Third => self.match3.as_ref(),
        }
    }
}

/// Aggregate counts over a result set. Status buckets exclude confirmed
/// results; `confirmed` is the size of the confirmation store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub auto: usize,
    pub review: usize,
    pub nomatch: usize,
    pub confirmed: usize,
    pub total: usize,
}
