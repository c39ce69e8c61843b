// keylink CLI - run record-matching jobs headless

mod exit_codes;
mod job;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use keylink_io::TableError;
use keylink_match::{MatchError, StatusFilter};
use tracing_subscriber::EnvFilter;

use exit_codes::{match_exit_code, table_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "keylink")]
#[command(about = "Link master records to source records by key similarity")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a matching job from a TOML job file
    #[command(after_help = "\
Examples:
  keylink run vendors.toml
  keylink run vendors.toml --filter review
  keylink run vendors.toml --json > report.json
  keylink run vendors.toml --dry-run --quiet")]
    Run {
        /// Path to the job file
        job: PathBuf,

        /// Only list results with this status (auto, review, nomatch, confirmed).
        /// Overrides `output.filter` from the job file.
        #[arg(long, value_name = "STATUS")]
        filter: Option<StatusFilter>,

        /// Print a JSON report to stdout instead of result lines
        #[arg(long)]
        json: bool,

        /// No progress bar and no summary line
        #[arg(long, short)]
        quiet: bool,

        /// Match and report, but do not write any output files
        #[arg(long)]
        dry_run: bool,

        /// Date stamped on merged rows (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        today: Option<NaiveDate>,
    },

    /// Check a job file without loading any tables
    #[command(after_help = "\
Examples:
  keylink validate vendors.toml")]
    Validate {
        /// Path to the job file
        job: PathBuf,
    },

    /// Score two key values against each other
    #[command(after_help = "\
Examples:
  keylink score 'Acme Corp' 'ACME CORPORATION'
  keylink score 'John Smith' 'smith john'")]
    Score {
        a: String,
        b: String,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { job, filter, json, quiet, dry_run, today } => {
            job::cmd_run(job::RunArgs { job, filter, json, quiet, dry_run, today })
        }
        Commands::Validate { job } => job::cmd_validate(job),
        Commands::Score { a, b } => job::cmd_score(&a, &b),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<MatchError> for CliError {
    fn from(err: MatchError) -> Self {
        let hint = match &err {
            MatchError::NoActiveSources => {
                Some("each source needs a key column and at least one entry in `fields`".to_string())
            }
            MatchError::EmptyMaster => Some("the master file has a header but no data rows".to_string()),
            MatchError::MissingPreviousMaster => {
                Some("set output.previous_master to the earlier export".to_string())
            }
            _ => None,
        };
        Self { code: match_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<TableError> for CliError {
    fn from(err: TableError) -> Self {
        let hint = match &err {
            TableError::Read { .. } => {
                Some("paths in the job file resolve against the job file's directory".to_string())
            }
            TableError::TooLarge { .. } => Some("write a .csv output instead".to_string()),
            _ => None,
        };
        Self { code: table_exit_code(&err), message: err.to_string(), hint }
    }
}
