//! Result rendering: one line per result for people, a JSON document for scripts.

use keylink_match::{Candidate, MatchResult, MatchSession, MatchStats, MatchStatus, Value};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub engine_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub stats: MatchStats,
    pub results: Vec<ResultView>,
}

#[derive(Debug, Serialize)]
pub struct ResultView {
    /// Position in the full (unfiltered) result list.
    pub index: usize,
    pub master_key: Value,
    pub status: MatchStatus,
    pub confirmed: bool,
    pub overridden: bool,
    pub best_match: CandidateView,
    pub alternatives: Vec<CandidateView>,
}

#[derive(Debug, Serialize)]
pub struct CandidateView {
    pub source: String,
    pub row: usize,
    pub key: Value,
    pub score: f64,
}

impl CandidateView {
    fn new(session: &MatchSession, candidate: &Candidate) -> Self {
        Self {
            source: source_name(session, candidate),
            row: candidate.row_index,
            key: candidate.key.clone(),
            score: round1(candidate.score),
        }
    }
}

/// Scores are reported to one decimal, like the review table shows them.
fn round1(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

fn source_name(session: &MatchSession, candidate: &Candidate) -> String {
    session
        .source(candidate.source_id)
        .map(|s| s.dataset.name.clone())
        .unwrap_or_else(|| candidate.source_id.to_string())
}

pub fn build(session: &MatchSession, name: Option<&str>) -> Report {
    let results = session
        .filtered()
        .into_iter()
        .map(|(index, result)| ResultView {
            index,
            master_key: result.master_key.clone(),
            status: result.status,
            confirmed: result.confirmed,
            overridden: result.overridden,
            best_match: CandidateView::new(session, &result.best_match),
            alternatives: [&result.match2, &result.match3]
                .into_iter()
                .flatten()
                .map(|c| CandidateView::new(session, c))
                .collect(),
        })
        .collect();

    Report {
        name: name.map(str::to_string),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        filter: session.status_filter().map(|f| f.to_string()),
        stats: session.stats(),
        results,
    }
}

/// `   3  review   [x]  66.7  Acme Corp  ->  ACME CORP LTD  (erp.csv)`
pub fn result_line(session: &MatchSession, index: usize, result: &MatchResult) -> String {
    let best = &result.best_match;
    format!(
        "{:>4}  {:<7}  {}  {:>5.1}  {}  ->  {}  ({}){}",
        index + 1,
        result.status,
        if result.confirmed { "[x]" } else { "[ ]" },
        best.score,
        result.master_key,
        best.key,
        source_name(session, best),
        if result.overridden { "  overridden" } else { "" },
    )
}

pub fn summary_line(stats: &MatchStats) -> String {
    format!(
        "{} rows: {} auto, {} review, {} no match, {} confirmed",
        stats.total, stats.auto, stats.review, stats.nomatch, stats.confirmed
    )
}
