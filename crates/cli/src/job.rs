//! `keylink run`, `validate` and `score`: job-file driven matching.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use keylink_io::{load_table, write_table, Table};
use keylink_match::{
    classify, score, CancelToken, Dataset, JobConfig, MatchError, MatchSession, Row, RunOutcome,
    StatusFilter,
};
use log::{debug, info};

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::report;
use crate::CliError;

pub struct RunArgs {
    pub job: PathBuf,
    pub filter: Option<StatusFilter>,
    pub json: bool,
    pub quiet: bool,
    pub dry_run: bool,
    pub today: Option<NaiveDate>,
}

fn read_job(path: &Path) -> Result<JobConfig, CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read job file {}: {e}", path.display()))
    })?;
    Ok(JobConfig::from_toml(&config_str)?)
}

/// Load a table named in the job file, relative to the job's directory.
fn load(base_dir: &Path, file: &str) -> Result<Table, CliError> {
    let path = base_dir.join(file);
    Ok(load_table(&path)?)
}

fn columns_hint(dataset: &Dataset) -> String {
    format!("{} has columns: {}", dataset.name, dataset.columns.join(", "))
}

fn write(base_dir: &Path, file: &str, rows: &[Row], sheet: &str) -> Result<PathBuf, CliError> {
    let path = base_dir.join(file);
    write_table(&path, rows, sheet)?;
    Ok(path)
}

/// Build a session from the job: master, sources, options, carried-over
/// confirmations and the previous master for merging.
fn build_session(config: &JobConfig, base_dir: &Path) -> Result<MatchSession, CliError> {
    let mut session = MatchSession::new();

    let master = load(base_dir, &config.master.file)?;
    session.load_master(master.name, master.rows);
    if let Some(key) = &config.master.key {
        session
            .set_master_key_field(key)
            .map_err(|e| CliError::from(e).with_hint(columns_hint(&session.master().dataset)))?;
    }

    for (i, source_config) in config.sources.iter().enumerate() {
        // a fresh session starts with one empty source slot
        let id = match session.sources().get(i) {
            Some(source) => source.id,
            None => session.add_source()?,
        };
        let table = load(base_dir, &source_config.file)?;
        session.load_source(id, table.name, table.rows)?;
        let unknown_column = |e: MatchError, session: &MatchSession| {
            let hint = session.source(id).map(|s| columns_hint(&s.dataset)).unwrap_or_default();
            CliError::from(e).with_hint(hint)
        };
        if let Some(key) = &source_config.key {
            session
                .set_source_key_field(id, key)
                .map_err(|e| unknown_column(e, &session))?;
        }
        for field in &source_config.fields {
            let selected = session
                .toggle_mapped_field(id, field)
                .map_err(|e| unknown_column(e, &session))?;
            if !selected {
                // listed twice; the second toggle undid the first
                session.toggle_mapped_field(id, field)?;
            }
        }
    }

    session.set_skip_confirmed(config.skip_confirmed);
    session.seed_confirmations(config.confirmed.iter().cloned());

    if let Some(file) = &config.output.previous_master {
        let previous = load(base_dir, file)?;
        session.load_previous_master(previous.name, previous.rows);
    }

    Ok(session)
}

fn progress_bar(total: usize, quiet: bool) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if quiet {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = ProgressStyle::default_bar()
        .template("matching [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = read_job(&args.job)?;
    let base_dir = args.job.parent().unwrap_or_else(|| Path::new("."));
    debug!("job {} (base dir {})", args.job.display(), base_dir.display());

    let mut session = build_session(&config, base_dir)?;

    let bar = progress_bar(session.master().dataset.len(), args.quiet);
    let outcome = session.run_matching(CancelToken::new(), |p| bar.set_position(p.processed as u64));
    bar.finish_and_clear();

    match outcome? {
        RunOutcome::Completed { rows } => info!("matched {rows} master rows"),
        RunOutcome::Cancelled => return Err(CliError::general("matching was cancelled")),
    }

    session.set_status_filter(args.filter.or(config.output.filter));

    if args.json {
        let report = report::build(&session, config.name.as_deref());
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        for (index, result) in session.filtered() {
            println!("{}", report::result_line(&session, index, result));
        }
    }

    if !args.dry_run {
        write_outputs(&session, &config, base_dir, args.today, args.quiet)?;
    }

    if !args.quiet {
        eprintln!("{}", report::summary_line(&session.stats()));
    }
    Ok(())
}

fn write_outputs(
    session: &MatchSession,
    config: &JobConfig,
    base_dir: &Path,
    today: Option<NaiveDate>,
    quiet: bool,
) -> Result<(), CliError> {
    let output = &config.output;
    let mut written = Vec::new();

    if let Some(file) = &output.mapping {
        written.push(write(base_dir, file, &session.mapping_export()?, "Mapping Results")?);
    }
    if let Some(file) = &output.updated_master {
        written.push(write(base_dir, file, &session.updated_master_export()?, "Updated Master")?);
    }
    if let Some(file) = &output.merged {
        let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
        let (rows, summary) = session.merge_export(today)?;
        written.push(write(base_dir, file, &rows, "Merged Master")?);
        if !quiet {
            eprintln!(
                "merged {} rows: {} updated, {} not updated",
                summary.rows, summary.updated, summary.not_updated
            );
        }
    }

    if !quiet {
        for path in written {
            eprintln!("wrote {}", path.display());
        }
    }
    Ok(())
}

pub fn cmd_validate(job: PathBuf) -> Result<(), CliError> {
    let config = read_job(&job)?;
    let outputs = [
        &config.output.mapping,
        &config.output.updated_master,
        &config.output.merged,
    ]
    .iter()
    .filter(|o| o.is_some())
    .count();
    eprintln!(
        "valid: job '{}' with {} source(s), {} output(s)",
        config.name.as_deref().unwrap_or("unnamed"),
        config.sources.len(),
        outputs,
    );
    Ok(())
}

pub fn cmd_score(a: &str, b: &str) -> Result<(), CliError> {
    let s = score(&a.into(), &b.into());
    println!("{:.1} {}", s, classify(s));
    Ok(())
}
