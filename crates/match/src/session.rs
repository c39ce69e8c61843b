//! Per-job state and the user actions that mutate it.
//!
//! A [`MatchSession`] owns the loaded tables, the confirmation store and the
//! current result set. Every mutation goes through a method here and replaces
//! or edits state in one step; a matching run borrows the session immutably,
//! so nothing observable changes until [`MatchSession::apply_run`].

use chrono::NaiveDate;
use log::{debug, info};

use crate::confirm::ConfirmationStore;
use crate::engine::{self, drive, CancelToken, MatchRun, Progress, RunInput, RunOptions};
use crate::error::MatchError;
use crate::export::{self, MergeSummary};
use crate::model::{
    Alternative, Dataset, MatchResult, MatchStats, Master, Row, Source, SourceId, Value,
};
use crate::project::{self, StatusFilter};

/// Upper bound on configured sources.
pub const MAX_SOURCES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { rows: usize },
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct MatchSession {
    master: Master,
    sources: Vec<Source>,
    next_source_id: u32,
    confirmations: ConfirmationStore,
    results: Vec<MatchResult>,
    skip_confirmed: bool,
    status_filter: Option<StatusFilter>,
    previous_master: Dataset,
    yield_every: usize,
}

impl Default for MatchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchSession {
    /// A fresh job: no data, one empty source slot, skip-confirmed on.
    pub fn new() -> Self {
        Self {
            master: Master::default(),
            sources: vec![Source::new(SourceId(1))],
            next_source_id: 2,
            confirmations: ConfirmationStore::new(),
            results: Vec::new(),
            skip_confirmed: true,
            status_filter: None,
            previous_master: Dataset::default(),
            yield_every: engine::DEFAULT_YIELD_EVERY,
        }
    }

    /// Start a new job. Clears data, results and every confirmation.
    pub fn reset(&mut self) {
        debug!("session reset ({} confirmations dropped)", self.confirmations.len());
        *self = Self::new();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn master(&self) -> &Master {
        &self.master
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn confirmations(&self) -> &ConfirmationStore {
        &self.confirmations
    }

    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    pub fn skip_confirmed(&self) -> bool {
        self.skip_confirmed
    }

    pub fn status_filter(&self) -> Option<StatusFilter> {
        self.status_filter
    }

    pub fn previous_master(&self) -> &Dataset {
        &self.previous_master
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Replace the master table. The key column defaults to the first column.
    pub fn load_master(&mut self, name: impl Into<String>, rows: Vec<Row>) {
        let dataset = Dataset::new(name, rows);
        let key_field = dataset.columns.first().cloned().unwrap_or_default();
        info!("loaded master '{}': {} rows", dataset.name, dataset.len());
        self.master = Master { dataset, key_field };
    }

    pub fn set_master_key_field(&mut self, column: &str) -> Result<(), MatchError> {
        if !self.master.dataset.has_column(column) {
            return Err(MatchError::UnknownColumn {
                dataset: self.master.dataset.name.clone(),
                column: column.into(),
            });
        }
        self.master.key_field = column.into();
        Ok(())
    }

    pub fn add_source(&mut self) -> Result<SourceId, MatchError> {
        if self.sources.len() >= MAX_SOURCES {
            return Err(MatchError::TooManySources { max: MAX_SOURCES });
        }
        let id = SourceId(self.next_source_id);
        self.next_source_id += 1;
        self.sources.push(Source::new(id));
        Ok(id)
    }

    pub fn remove_source(&mut self, id: SourceId) -> Result<(), MatchError> {
        let before = self.sources.len();
        self.sources.retain(|s| s.id != id);
        if self.sources.len() == before {
            return Err(MatchError::UnknownSource(id));
        }
        Ok(())
    }

    fn source_mut(&mut self, id: SourceId) -> Result<&mut Source, MatchError> {
        self.sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(MatchError::UnknownSource(id))
    }

    /// Replace a source's table. The key column resets to the first column
    /// and the mapped-field selection is cleared.
    pub fn load_source(
        &mut self,
        id: SourceId,
        name: impl Into<String>,
        rows: Vec<Row>,
    ) -> Result<(), MatchError> {
        let source = self.source_mut(id)?;
        source.dataset = Dataset::new(name, rows);
        source.key_field = source.dataset.columns.first().cloned().unwrap_or_default();
        source.mapped_fields.clear();
        info!("loaded {} '{}': {} rows", id, source.dataset.name, source.dataset.len());
        Ok(())
    }

    pub fn set_source_key_field(&mut self, id: SourceId, column: &str) -> Result<(), MatchError> {
        let source = self.source_mut(id)?;
        if !source.dataset.has_column(column) {
            return Err(MatchError::UnknownColumn {
                dataset: source.dataset.name.clone(),
                column: column.into(),
            });
        }
        source.key_field = column.into();
        Ok(())
    }

    /// Add or remove a column from the source's mapped fields; returns
    /// whether it is now selected.
    pub fn toggle_mapped_field(&mut self, id: SourceId, column: &str) -> Result<bool, MatchError> {
        let source = self.source_mut(id)?;
        if let Some(pos) = source.mapped_fields.iter().position(|f| f == column) {
            source.mapped_fields.remove(pos);
            return Ok(false);
        }
        if !source.dataset.has_column(column) {
            return Err(MatchError::UnknownColumn {
                dataset: source.dataset.name.clone(),
                column: column.into(),
            });
        }
        source.mapped_fields.push(column.into());
        Ok(true)
    }

    pub fn set_skip_confirmed(&mut self, skip: bool) {
        self.skip_confirmed = skip;
    }

    pub fn set_status_filter(&mut self, filter: Option<StatusFilter>) {
        self.status_filter = filter;
    }

    /// Rows processed per progress event.
    pub fn set_yield_every(&mut self, rows: usize) {
        self.yield_every = rows.max(1);
    }

    pub fn load_previous_master(&mut self, name: impl Into<String>, rows: Vec<Row>) {
        self.previous_master = Dataset::new(name, rows);
        info!(
            "loaded previous master '{}': {} rows",
            self.previous_master.name,
            self.previous_master.len()
        );
    }

    /// Mark key values as confirmed without a result to attach them to,
    /// e.g. decisions carried over from an earlier sitting.
    pub fn seed_confirmations<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            self.confirmations.insert(&Value::Text(key.into()));
        }
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    /// Prepare a run over the current configuration. Fails if there is no
    /// master data or no active source.
    pub fn start_run(&self, cancel: CancelToken) -> Result<MatchRun<'_>, MatchError> {
        let input = RunInput {
            master: &self.master.dataset,
            master_key_field: &self.master.key_field,
            sources: &self.sources,
            confirmations: &self.confirmations,
            previous: &self.results,
        };
        let options = RunOptions {
            skip_confirmed: self.skip_confirmed,
            yield_every: self.yield_every,
            cancel,
        };
        engine::run(input, options)
    }

    /// Install a completed run's results, replacing the previous set.
    pub fn apply_run(&mut self, results: Vec<MatchResult>) {
        self.results = results;
        self.status_filter = None;
    }

    /// Run matching to completion, reporting progress as it goes.
    pub fn run_matching(
        &mut self,
        cancel: CancelToken,
        on_progress: impl FnMut(Progress),
    ) -> Result<RunOutcome, MatchError> {
        let results = {
            let run = self.start_run(cancel)?;
            drive(run, on_progress)
        };
        match results {
            Some(results) => {
                let rows = results.len();
                self.apply_run(results);
                Ok(RunOutcome::Completed { rows })
            }
            None => Ok(RunOutcome::Cancelled),
        }
    }

    // -----------------------------------------------------------------------
    // Review actions
    // -----------------------------------------------------------------------

    /// Toggle confirmation of the result at `index`. Returns the new state.
    ///
    /// Confirmation is keyed by the master key value, so every other result
    /// with the same key follows along (flag only, nothing is re-scored).
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn confirm(&mut self, index: usize) -> bool {
        let key = self.results[index].master_key.clone();
        let confirmed = self.confirmations.toggle(&key);
        self.sync_confirmed(&key, confirmed);
        debug!("result {index} ('{key}') confirmed = {confirmed}");
        confirmed
    }

    /// Replace the best match of the result at `index` with one of its
    /// ranked alternatives and confirm it.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn select_alternative(&mut self, index: usize, alt: Alternative) -> Result<(), MatchError> {
        let result = &self.results[index];
        let chosen = result
            .alternative(alt)
            .cloned()
            .ok_or(MatchError::MissingAlternative { index, rank: alt.as_str() })?;
        let key = result.master_key.clone();

        self.confirmations.insert(&key);
        let result = &mut self.results[index];
        result.best_match = chosen;
        result.overridden = true;
        self.sync_confirmed(&key, true);
        debug!("result {index} ('{key}') overridden with {} candidate", alt.as_str());
        Ok(())
    }

    fn sync_confirmed(&mut self, key: &Value, confirmed: bool) {
        let text = key.key_text();
        for r in self.results.iter_mut().filter(|r| r.key_text() == text) {
            r.confirmed = confirmed;
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Results under the active status filter, with their indices.
    pub fn filtered(&self) -> Vec<(usize, &MatchResult)> {
        project::filter(&self.results, self.status_filter)
    }

    pub fn stats(&self) -> MatchStats {
        project::aggregate(&self.results, &self.confirmations)
    }

    // -----------------------------------------------------------------------
    // Exports
    // -----------------------------------------------------------------------

    pub fn mapping_export(&self) -> Result<Vec<Row>, MatchError> {
        self.require_results()?;
        Ok(export::mapping_rows(&self.results, &self.sources))
    }

    pub fn updated_master_export(&self) -> Result<Vec<Row>, MatchError> {
        self.require_results()?;
        Ok(export::updated_master_rows(&self.results, &self.sources))
    }

    pub fn merge_export(&self, today: NaiveDate) -> Result<(Vec<Row>, MergeSummary), MatchError> {
        if self.previous_master.is_empty() {
            return Err(MatchError::MissingPreviousMaster);
        }
        self.require_results()?;
        let (rows, summary) = export::merge_rows(
            &self.previous_master.rows,
            &self.master.key_field,
            &self.results,
            &self.sources,
            today,
        );
        info!(
            "merged {} rows: {} updated, {} kept original",
            summary.rows, summary.updated, summary.not_updated
        );
        Ok((rows, summary))
    }

    fn require_results(&self) -> Result<(), MatchError> {
        if self.results.is_empty() {
            return Err(MatchError::NoResults);
        }
        Ok(())
    }
}
