use thiserror::Error;

use crate::model::SourceId;

/// Errors surfaced to the user. None of these leave partial state behind:
/// the refused operation simply did not happen.
#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    /// Matching was requested with no master rows loaded.
    #[error("master dataset is empty: load a master file first")]
    EmptyMaster,
    /// No source has rows, a key column and at least one mapped field.
    #[error("no active source: configure at least one source with a key column and mapped fields")]
    NoActiveSources,
    /// Merge export requested without a previous master table.
    #[error("no previous master loaded: load the previously exported master before merging")]
    MissingPreviousMaster,
    /// Export requested before any matching run produced results.
    #[error("no match results: run matching first")]
    NoResults,
    /// Source slot limit reached.
    #[error("at most {max} sources are supported")]
    TooManySources { max: usize },
    /// A source id that is not (or no longer) part of the session.
    #[error("unknown source: {0}")]
    UnknownSource(SourceId),
    /// A column name that the dataset does not have.
    #[error("{dataset}: no column named '{column}'")]
    UnknownColumn { dataset: String, column: String },
    /// The chosen alternative does not exist on that result.
    #[error("result {index} has no {rank} candidate")]
    MissingAlternative { index: usize, rank: &'static str },
    /// TOML parse / deserialization error.
    #[error("job config parse error: {0}")]
    ConfigParse(String),
    /// Job config validation error.
    #[error("job config validation error: {0}")]
    ConfigValidation(String),
}
