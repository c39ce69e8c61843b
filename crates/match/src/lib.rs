//! `keylink-match`: record linking engine.
//!
//! Pure engine crate: receives pre-loaded rows, returns ranked and classified
//! matches, and tracks human confirmations for the lifetime of a session.
//! No CLI or IO dependencies.

pub mod classify;
pub mod config;
pub mod confirm;
pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod project;
pub mod ranker;
pub mod scorer;
pub mod session;

pub use classify::classify;
pub use config::JobConfig;
pub use confirm::ConfirmationStore;
pub use engine::{run, CancelToken, MatchRun, Progress, RunEvent, RunInput, RunOptions};
pub use error::MatchError;
pub use model::{
    Alternative, Candidate, Dataset, Master, MatchResult, MatchStats, MatchStatus, Row, Source,
    SourceId, Value,
};
pub use project::StatusFilter;
pub use scorer::score;
pub use session::{MatchSession, RunOutcome};
