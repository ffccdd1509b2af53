// Milla CLI - blind reception and auto-routing from the command line

mod exit_codes;
mod notify;
mod reception;
mod routes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use milla_config::Settings;
use milla_core::CoreError;
use milla_recon::ReceptionPolicy;
use milla_store::SqliteStore;

use exit_codes::{core_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use reception::CountArgs;
use routes::RoutesCommands;

#[derive(Parser)]
#[command(name = "milla")]
#[command(about = "Blind goods reception and capacity-aware dispatch routing")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config_dir>/milla/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides storage.database)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load master data and manifests from a TOML dataset
    #[command(after_help = "\
Examples:
  milla seed dataset.toml
  milla --db /tmp/milla.db seed dataset.toml --json")]
    Seed {
        /// Dataset file with [[articles]], [[vehicles]], [[recipients]], [[loads]]
        dataset: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// List loads still pending reception
    Loads {
        #[arg(long)]
        json: bool,
    },

    /// Add a physical count to a load's running total
    #[command(after_help = "\
Examples:
  milla count 3 CJ-12 2 --unit intermediate --operator ana
  milla count 3 17 5 --by-id")]
    Count {
        /// Load id
        load: i64,

        /// Article code as scanned or typed (or catalog id with --by-id)
        article: String,

        /// Quantity in the selected unit
        #[arg(allow_negative_numbers = true)]
        quantity: f64,

        /// Unit tier: general, intermediate, special
        #[arg(long, default_value = "general")]
        unit: String,

        /// Treat ARTICLE as a catalog article id
        #[arg(long)]
        by_id: bool,

        /// Operator recorded on the reception session
        #[arg(long)]
        operator: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Compare counts against the manifest (exit 10 = recount, 11 = novelty)
    Validate {
        /// Load id
        load: i64,

        #[arg(long)]
        json: bool,
    },

    /// Show counted totals so far
    Progress {
        /// Load id
        load: i64,

        #[arg(long)]
        json: bool,
    },

    /// Plan and commit vehicle routes
    #[command(subcommand)]
    Routes(RoutesCommands),
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let hint = match &err {
            CoreError::NotFound { entity: "load", .. } => Some("list pending loads with `milla loads`".to_string()),
            CoreError::Persistence(_) => Some("check the database path and that no other process holds it".to_string()),
            _ => None,
        };
        Self { code: core_exit_code(&err), message: err.to_string(), hint }
    }
}

/// Print exactly one JSON value on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// Context
// ============================================================================

pub struct Context {
    pub settings: Settings,
    pub db: PathBuf,
}

impl Context {
    fn new(settings: Settings, db_override: Option<PathBuf>) -> Self {
        let db = db_override.unwrap_or_else(|| settings.storage.effective_database());
        Self { settings, db }
    }

    pub fn open_store(&self) -> Result<SqliteStore, CliError> {
        if let Some(parent) = self.db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::general(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        Ok(SqliteStore::open(&self.db)?)
    }

    pub fn policy(&self) -> Result<ReceptionPolicy, CliError> {
        Ok(ReceptionPolicy::new(self.settings.reception.escalation_threshold)?)
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    // Also routes `log` records from the library crates.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    Settings::load(path).map_err(|e| {
        let shown = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(Settings::config_path_display);
        CliError::general(e.to_string()).with_hint(format!("fix or remove {shown}"))
    })
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(&settings.log.level);
    let ctx = Context::new(settings, cli.db);

    match cli.command {
        Commands::Seed { dataset, json } => reception::cmd_seed(&ctx, dataset, json),
        Commands::Loads { json } => reception::cmd_loads(&ctx, json),
        Commands::Count { load, article, quantity, unit, by_id, operator, json } => reception::cmd_count(
            &ctx,
            CountArgs { load, article, quantity, unit, by_id, operator, json },
        ),
        Commands::Validate { load, json } => reception::cmd_validate(&ctx, load, json),
        Commands::Progress { load, json } => reception::cmd_progress(&ctx, load, json),
        Commands::Routes(cmd) => routes::cmd_routes(&ctx, cmd),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
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
