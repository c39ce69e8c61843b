use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::classify::classify;
use crate::confirm::ConfirmationStore;
use crate::error::MatchError;
use crate::model::{cell, Dataset, MatchResult, Source};
use crate::ranker::{top_candidates, CandidatePool, TOP_N};

/// Master rows processed between two progress events.
pub const DEFAULT_YIELD_EVERY: usize = 10;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything a run reads. All borrowed: nothing can change mid-run.
#[derive(Debug, Clone, Copy)]
pub struct RunInput<'a> {
    pub master: &'a Dataset,
    pub master_key_field: &'a str,
    pub sources: &'a [Source],
    pub confirmations: &'a ConfirmationStore,
    /// Result set of the previous run, consulted for confirmed keys.
    pub previous: &'a [MatchResult],
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Reuse the previous result for confirmed keys instead of re-scoring.
    pub skip_confirmed: bool,
    pub yield_every: usize,
    pub cancel: CancelToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip_confirmed: true,
            yield_every: DEFAULT_YIELD_EVERY,
            cancel: CancelToken::new(),
        }
    }
}

/// Shared flag a host can set to abandon a run between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug)]
pub enum RunEvent {
    /// Rows processed so far; monotonically increasing.
    Progress(Progress),
    /// One result per master row, in master order. Always the last event.
    Completed(Vec<MatchResult>),
    /// The cancel token was set. No results are produced.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Validate preconditions and prepare a lazy matching run.
///
/// The returned [`MatchRun`] does no work until iterated; each `next()`
/// processes one chunk of `yield_every` master rows and reports progress,
/// which lets a single-threaded host interleave its own work.
pub fn run<'a>(input: RunInput<'a>, options: RunOptions) -> Result<MatchRun<'a>, MatchError> {
    if input.master.is_empty() {
        return Err(MatchError::EmptyMaster);
    }
    let pool = CandidatePool::from_sources(input.sources);
    if pool.is_empty() {
        return Err(MatchError::NoActiveSources);
    }

    // Prior results per confirmed key, in master order. The nth row with a
    // key reuses the nth prior result for that key.
    let mut previous: HashMap<String, Vec<&'a MatchResult>> = HashMap::new();
    if options.skip_confirmed {
        for result in input.previous {
            if input.confirmations.contains(&result.master_key) {
                previous.entry(result.key_text()).or_default().push(result);
            }
        }
    }

    debug!(
        "starting run: {} master rows x {} pooled source rows, {} reusable confirmed results",
        input.master.len(),
        pool.len(),
        previous.values().map(Vec::len).sum::<usize>()
    );

    Ok(MatchRun {
        master: input.master,
        key_field: input.master_key_field,
        confirmations: input.confirmations,
        pool,
        previous,
        occurrences: HashMap::new(),
        skip_confirmed: options.skip_confirmed,
        yield_every: options.yield_every.max(1),
        cancel: options.cancel,
        next_row: 0,
        reused: 0,
        results: Vec::with_capacity(input.master.len()),
        finished: false,
    })
}

pub struct MatchRun<'a> {
    master: &'a Dataset,
    key_field: &'a str,
    confirmations: &'a ConfirmationStore,
    pool: CandidatePool,
    previous: HashMap<String, Vec<&'a MatchResult>>,
    occurrences: HashMap<String, usize>,
    skip_confirmed: bool,
    yield_every: usize,
    cancel: CancelToken,
    next_row: usize,
    reused: usize,
    results: Vec<MatchResult>,
    finished: bool,
}

impl MatchRun<'_> {
    pub fn total(&self) -> usize {
        self.master.len()
    }

    fn process_row(&mut self, index: usize) {
        let row = &self.master.rows[index];
        let key = cell(row, self.key_field).clone();

        if self.skip_confirmed && self.confirmations.contains(&key) {
            let text = key.key_text();
            let seen = self.occurrences.entry(text.clone()).or_insert(0);
            let nth = *seen;
            *seen += 1;
            // more rows with this key than last time: the extras are re-scored
            if let Some(prev) = self.previous.get(&text).and_then(|prior| prior.get(nth)) {
                self.results.push((*prev).clone());
                self.reused += 1;
                return;
            }
        }

        let mut ranked = top_candidates(&key, &self.pool, TOP_N).into_iter();
        let Some(best_match) = ranked.next() else {
            unreachable!("candidate pool is checked non-empty before the run starts");
        };
        let status = classify(best_match.score);
        let confirmed = self.confirmations.contains(&key);

        self.results.push(MatchResult {
            master_index: index,
            master_row: Arc::clone(row),
            master_key: key,
            best_match,
            match2: ranked.next(),
            match3: ranked.next(),
            status,
            confirmed,
            overridden: false,
        });
    }
}

impl Iterator for MatchRun<'_> {
    type Item = RunEvent;

    fn next(&mut self) -> Option<RunEvent> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            debug!("run cancelled after {} of {} rows", self.next_row, self.total());
            self.finished = true;
            self.results.clear();
            return Some(RunEvent::Cancelled);
        }

        let total = self.total();
        if self.next_row >= total {
            self.finished = true;
            info!(
                "matched {} master rows against {} source rows ({} confirmed results reused)",
                total,
                self.pool.len(),
                self.reused
            );
            return Some(RunEvent::Completed(std::mem::take(&mut self.results)));
        }

        let end = (self.next_row + self.yield_every).min(total);
        for index in self.next_row..end {
            self.process_row(index);
        }
        self.next_row = end;

        Some(RunEvent::Progress(Progress { processed: end, total }))
    }
}

/// Drive a run to the end, forwarding progress. `None` if it was cancelled.
pub fn drive(run: MatchRun<'_>, mut on_progress: impl FnMut(Progress)) -> Option<Vec<MatchResult>> {
    for event in run {
        match event {
            RunEvent::Progress(p) => on_progress(p),
            RunEvent::Completed(results) => return Some(results),
            RunEvent::Cancelled => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchStatus, Row, SourceId, Value};

    fn table(name: &str, key_col: &str, keys: &[&str]) -> Dataset {
        let rows = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let mut r = Row::new();
                r.insert(key_col.into(), Value::from(*k));
                r.insert("Id".into(), Value::Number(i as f64));
                r
            })
            .collect();
        Dataset::new(name, rows)
    }

    fn source(keys: &[&str]) -> Source {
        Source {
            id: SourceId(1),
            dataset: table("erp.csv", "Supplier", keys),
            key_field: "Supplier".into(),
            mapped_fields: vec!["Id".into()],
        }
    }

    fn input<'a>(
        master: &'a Dataset,
        sources: &'a [Source],
        store: &'a ConfirmationStore,
        previous: &'a [MatchResult],
    ) -> RunInput<'a> {
        RunInput {
            master,
            master_key_field: "Vendor",
            sources,
            confirmations: store,
            previous,
        }
    }

    #[test]
    fn empty_master_is_refused() {
        let master = Dataset::default();
        let sources = [source(&["a"])];
        let store = ConfirmationStore::new();
        let err = run(input(&master, &sources, &store, &[]), RunOptions::default()).err();
        assert_eq!(err, Some(MatchError::EmptyMaster));
    }

    #[test]
    fn no_active_source_is_refused() {
        let master = table("m.csv", "Vendor", &["a"]);
        let mut inactive = source(&["a"]);
        inactive.key_field.clear();
        let sources = [inactive];
        let store = ConfirmationStore::new();
        let err = run(input(&master, &sources, &store, &[]), RunOptions::default()).err();
        assert_eq!(err, Some(MatchError::NoActiveSources));
    }

    #[test]
    fn progress_is_chunked_and_monotonic() {
        let keys: Vec<String> = (0..25).map(|i| format!("vendor {i}")).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let master = table("m.csv", "Vendor", &key_refs);
        let sources = [source(&["vendor 3"])];
        let store = ConfirmationStore::new();
        let events: Vec<RunEvent> = run(input(&master, &sources, &store, &[]), RunOptions::default())
            .unwrap()
            .collect();

        let processed: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress(p) => Some(p.processed),
                _ => None,
            })
            .collect();
        assert_eq!(processed, vec![10, 20, 25]);

        match events.last() {
            Some(RunEvent::Completed(results)) => {
                assert_eq!(results.len(), 25);
                assert!(results.iter().enumerate().all(|(i, r)| r.master_index == i));
                assert_eq!(results[3].status, MatchStatus::Auto);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_run_yields_no_results() {
        let master = table("m.csv", "Vendor", &["a", "b", "c"]);
        let sources = [source(&["a"])];
        let store = ConfirmationStore::new();
        let options = RunOptions { yield_every: 1, ..RunOptions::default() };
        let cancel = options.cancel.clone();
        let mut run = run(input(&master, &sources, &store, &[]), options).unwrap();

        assert!(matches!(run.next(), Some(RunEvent::Progress(_))));
        cancel.cancel();
        assert!(matches!(run.next(), Some(RunEvent::Cancelled)));
        assert!(run.next().is_none());
    }

    #[test]
    fn confirmed_key_reuses_previous_result() {
        let master = table("m.csv", "Vendor", &["acme corp", "globex"]);
        let sources = [source(&["acme corp", "globex inc"])];
        let mut store = ConfirmationStore::new();

        let first = drive(
            run(input(&master, &sources, &store, &[]), RunOptions::default()).unwrap(),
            |_| {},
        )
        .unwrap();

        // Hand-edit the prior result so reuse is observable.
        let mut previous = first.clone();
        previous[1].status = MatchStatus::Auto;
        previous[1].confirmed = true;
        store.insert(&Value::from("globex"));

        let second = drive(
            run(input(&master, &sources, &store, &previous), RunOptions::default()).unwrap(),
            |_| {},
        )
        .unwrap();
        assert_eq!(second[1], previous[1]);
        assert_eq!(second[0], first[0]);

        // Without skip_confirmed the key is re-scored but still flagged confirmed.
        let options = RunOptions { skip_confirmed: false, ..RunOptions::default() };
        let third = drive(run(input(&master, &sources, &store, &previous), options).unwrap(), |_| {})
            .unwrap();
        assert_eq!(third[1].status, MatchStatus::NoMatch);
        assert!(third[1].confirmed);
    }

    #[test]
    fn repeated_confirmed_key_reuses_result_by_occurrence() {
        let master = table("m.csv", "Vendor", &["acme", "globex", "acme"]);
        let sources = [source(&["acme"])];
        let mut store = ConfirmationStore::new();
        let first = drive(
            run(input(&master, &sources, &store, &[]), RunOptions::default()).unwrap(),
            |_| {},
        )
        .unwrap();
        store.insert(&Value::from("acme"));

        let second = drive(
            run(input(&master, &sources, &store, &first), RunOptions::default()).unwrap(),
            |_| {},
        )
        .unwrap();
        assert_eq!(second[0].master_index, 0);
        assert_eq!(second[2].master_index, 2);
        assert_eq!(second[2].master_row["Id"], Value::Number(2.0));

        // a third "acme" row has no prior result of its own and is re-scored
        let grown = table("m.csv", "Vendor", &["acme", "globex", "acme", "acme"]);
        let third = drive(
            run(input(&grown, &sources, &store, &second), RunOptions::default()).unwrap(),
            |_| {},
        )
        .unwrap();
        assert_eq!(third[2], second[2]);
        assert_eq!(third[3].master_index, 3);
        assert!(third[3].confirmed);
    }
}
