//! Output tables built from a result set. Pure: rows in, rows out. Writing
//! them to disk is the table writer's job.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{cell, Candidate, MatchResult, Row, Source, Value};

pub const COL_MASTER_KEY: &str = "Master Key";
pub const COL_BEST_MATCH: &str = "Best Match";
pub const COL_CONFIDENCE: &str = "Confidence";
pub const COL_STATUS: &str = "Status";
pub const COL_CONFIRMED: &str = "Confirmed";
pub const COL_MATCH_CONFIDENCE: &str = "MatchConfidence";
pub const COL_LAST_UPDATED: &str = "LastUpdated";
pub const COL_UPDATE_STATUS: &str = "UpdateStatus";
pub const UPDATED_SUFFIX: &str = "_Updated";

pub const UPDATE_STATUS_UPDATED: &str = "Updated";
pub const UPDATE_STATUS_NOT_UPDATED: &str = "Not Updated";

fn yes_no(flag: bool) -> Value {
    Value::from(if flag { "Yes" } else { "No" })
}

fn confidence(candidate: &Candidate) -> Value {
    Value::Number(candidate.score.round())
}

/// Mapped-field values of the best match, taken only from the source that
/// produced it. Sources without rows or mapped fields contribute nothing.
fn mapped_values<'a>(
    best: &'a Candidate,
    sources: &'a [Source],
) -> impl Iterator<Item = (&'a str, Value)> + 'a {
    sources
        .iter()
        .filter(|s| !s.dataset.is_empty() && !s.mapped_fields.is_empty())
        .filter(move |s| s.id == best.source_id)
        .flat_map(move |s| {
            s.mapped_fields
                .iter()
                .map(move |field| (field.as_str(), cell(&best.row, field).clone()))
        })
}

/// One row per result: key, best match, rounded confidence, status,
/// confirmation and the matched source's mapped fields.
pub fn mapping_rows(results: &[MatchResult], sources: &[Source]) -> Vec<Row> {
    results
        .iter()
        .map(|r| {
            let mut row = Row::new();
            row.insert(COL_MASTER_KEY.into(), r.master_key.clone());
            row.insert(COL_BEST_MATCH.into(), r.best_match.key.clone());
            row.insert(COL_CONFIDENCE.into(), confidence(&r.best_match));
            row.insert(COL_STATUS.into(), Value::from(r.status.as_str()));
            row.insert(COL_CONFIRMED.into(), yes_no(r.confirmed));
            for (field, value) in mapped_values(&r.best_match, sources) {
                row.insert(field.to_string(), value);
            }
            row
        })
        .collect()
}

/// Each master row with `MatchConfidence`, `Confirmed` and the mapped
/// fields appended as `<field>_Updated`.
pub fn updated_master_rows(results: &[MatchResult], sources: &[Source]) -> Vec<Row> {
    results
        .iter()
        .map(|r| {
            let mut row = (*r.master_row).clone();
            row.insert(COL_MATCH_CONFIDENCE.into(), confidence(&r.best_match));
            row.insert(COL_CONFIRMED.into(), yes_no(r.confirmed));
            for (field, value) in mapped_values(&r.best_match, sources) {
                row.insert(format!("{field}{UPDATED_SUFFIX}"), value);
            }
            row
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub rows: usize,
    pub updated: usize,
    pub not_updated: usize,
}

/// Overlay current results onto a previously exported master.
///
/// Every previous row is kept with all of its columns. Rows whose key has a
/// result get the mapped fields, `MatchConfidence`, `Confirmed` and
/// `LastUpdated = today` overlaid and are marked `Updated`; the rest are
/// marked `Not Updated` with an empty `LastUpdated`. When several results
/// share a key the last one wins. Empty keys never match.
pub fn merge_rows(
    previous: &[Arc<Row>],
    key_field: &str,
    results: &[MatchResult],
    sources: &[Source],
    today: NaiveDate,
) -> (Vec<Row>, MergeSummary) {
    let stamp = Value::from(today.format("%Y-%m-%d").to_string());

    let mut overlays: HashMap<String, Row> = HashMap::new();
    for r in results {
        let mut overlay = Row::new();
        for (field, value) in mapped_values(&r.best_match, sources) {
            overlay.insert(field.to_string(), value);
        }
        overlay.insert(COL_MATCH_CONFIDENCE.into(), confidence(&r.best_match));
        overlay.insert(COL_CONFIRMED.into(), yes_no(r.confirmed));
        overlay.insert(COL_LAST_UPDATED.into(), stamp.clone());
        overlays.insert(r.key_text(), overlay);
    }

    let mut summary = MergeSummary { rows: previous.len(), ..MergeSummary::default() };
    let rows = previous
        .iter()
        .map(|old| {
            let mut row = (**old).clone();
            let key = cell(old, key_field);
            let overlay = if key.is_empty() { None } else { overlays.get(&key.key_text()) };
            match overlay {
                Some(overlay) => {
                    for (k, v) in overlay {
                        row.insert(k.clone(), v.clone());
                    }
                    row.insert(COL_UPDATE_STATUS.into(), Value::from(UPDATE_STATUS_UPDATED));
                    summary.updated += 1;
                }
                None => {
                    row.insert(COL_UPDATE_STATUS.into(), Value::from(UPDATE_STATUS_NOT_UPDATED));
                    row.insert(COL_LAST_UPDATED.into(), Value::Empty);
                    summary.not_updated += 1;
                }
            }
            row
        })
        .collect();

    (rows, summary)
}
