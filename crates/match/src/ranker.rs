use std::collections::BTreeSet;
use std::sync::Arc;

use crate::model::{cell, Candidate, Row, Source, SourceId, Value};
use crate::scorer::{jaccard, tokenize};

/// Candidates kept per master row: the best match plus two alternatives.
pub const TOP_N: usize = 3;

/// One source row in the pooled candidate set, with its key pre-tokenized.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub source_id: SourceId,
    pub row_index: usize,
    pub row: Arc<Row>,
    pub key: Value,
    tokens: BTreeSet<String>,
}

/// Every row of every active source, in configured source order and then
/// file order. That order is the tie-breaker when scores are equal.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    entries: Vec<PoolEntry>,
}

impl CandidatePool {
    /// Pool the rows of all active sources. Inactive sources are skipped.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = &'a Source>) -> Self {
        let mut entries = Vec::new();
        for source in sources.into_iter().filter(|s| s.is_active()) {
            for (row_index, row) in source.dataset.rows.iter().enumerate() {
                let key = cell(row, &source.key_field).clone();
                let tokens = if key.is_empty() { BTreeSet::new() } else { tokenize(&key) };
                entries.push(PoolEntry {
                    source_id: source.id,
                    row_index,
                    row: Arc::clone(row),
                    key,
                    tokens,
                });
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }
}

/// Score `master_key` against every pooled row and keep the best `n`,
/// highest first. Equal scores keep pool order.
///
/// This is a full scan: O(pool size) per call, so a whole run is
/// O(master rows × total source rows). No blocking or indexing is done.
pub fn top_candidates(master_key: &Value, pool: &CandidatePool, n: usize) -> Vec<Candidate> {
    if n == 0 {
        return Vec::new();
    }
    let master_tokens = if master_key.is_empty() { BTreeSet::new() } else { tokenize(master_key) };

    // (score, pool index), descending by score
    let mut top: Vec<(f64, usize)> = Vec::with_capacity(n + 1);
    for (i, entry) in pool.entries.iter().enumerate() {
        let score = jaccard(&master_tokens, &entry.tokens);
        // strictly greater goes ahead, so ties stay in encounter order
        let pos = top.iter().position(|(s, _)| score > *s).unwrap_or(top.len());
        if pos < n {
            top.insert(pos, (score, i));
            top.truncate(n);
        }
    }

    top.into_iter()
        .map(|(score, i)| {
            let entry = &pool.entries[i];
            Candidate {
                source_id: entry.source_id,
                row_index: entry.row_index,
                row: Arc::clone(&entry.row),
                key: entry.key.clone(),
                score,
            }
        })
        .collect()
}
