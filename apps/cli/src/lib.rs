//! # Stockroom CLI Library
//!
//! Command-line front end for the component inventory.
//!
//! ## Module Organization
//! ```text
//! stockroom_cli/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── cli.rs          ◄─── clap definitions
//! ├── output.rs       ◄─── human / JSON printing
//! ├── state/
//! │   └── mod.rs      ◄─── AppContext (Database + VendorClient + mode)
//! ├── commands/
//! │   ├── mod.rs      ◄─── dispatch
//! │   ├── record.rs   ◄─── add / edit / show / delete
//! │   ├── search.rs   ◄─── search / adv-search / recent
//! │   ├── stock.rs    ◄─── checkout / checkin
//! │   ├── resolve.rs  ◄─── payload resolution
//! │   ├── scan.rs     ◄─── wedge and camera scan sessions
//! │   └── auth.rs     ◄─── vendor authorization
//! └── error.rs        ◄─── CliError for commands
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod state;

use clap::Parser;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::{CliError, CliResult};
use output::Printer;
use state::{AppContext, AppSettings};

/// Parses arguments, runs one command and maps the outcome to an exit code.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize Logging (stderr, RUST_LOG or the default filter)         │
/// │  2. Parse arguments                                                     │
/// │  3. Determine database path (--db, STOCKROOM_DB_PATH, data dir)         │
/// │  4. Connect to database & run migrations                                │
/// │  5. Load vendor config (credentials, tokens)                            │
/// │  6. Dispatch the command, print the result                              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let printer = Printer::new(cli.json);

    match execute(cli, &printer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(code = ?err.code, "Command failed: {}", err.message);
            report(&err, &printer);
            ExitCode::from(err.code.exit_status())
        }
    }
}

async fn execute(cli: Cli, printer: &Printer) -> CliResult<()> {
    let db_path = match cli.db {
        Some(path) => path,
        None => get_database_path()?,
    };
    info!(?db_path, mode = %cli.mode, "Starting stockroom");

    let settings = AppSettings {
        db_path,
        config_path: cli.config,
        mode: cli.mode,
    };
    let ctx = AppContext::open(&settings).await?;

    let result = commands::dispatch(&ctx, cli.command, printer).await;
    ctx.close().await;
    result
}

fn report(err: &CliError, printer: &Printer) {
    if printer.is_json() {
        match serde_json::to_string_pretty(err) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", err),
        }
    } else {
        eprintln!("error: {}", err.message);
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockroom=trace` - Show trace for stockroom crates only
/// - Default: `info,stockroom=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path based on the platform.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/org.stockroom.stockroom/inventory.db`
/// - **Windows**: `%APPDATA%\stockroom\stockroom\data\inventory.db`
/// - **Linux**: `~/.local/share/stockroom/inventory.db`
///
/// `STOCKROOM_DB_PATH` is read by clap before this is reached.
fn get_database_path() -> CliResult<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "stockroom", "stockroom")
        .ok_or_else(|| CliError::internal("Could not determine app data directory"))?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("inventory.db"))
}
