//! # Commands Module
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (dispatch)
//! ├── record.rs   ◄─── add, edit, show, delete
//! ├── search.rs   ◄─── search, adv-search, recent
//! ├── stock.rs    ◄─── checkout, checkin
//! ├── resolve.rs  ◄─── payload → stored record or draft
//! ├── scan.rs     ◄─── wedge or camera scan session
//! └── auth.rs     ◄─── vendor login, status, logout
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  $ stockroom checkout 0000042 5 --project robot                         │
//! │         │                                                               │
//! │         │ (clap)                                                        │
//! │         ▼                                                               │
//! │  Command::Checkout { barcode, qty, project }                            │
//! │         │                                                               │
//! │         │ dispatch()                                                    │
//! │         ▼                                                               │
//! │  stock::checkout(&AppContext, ...) -> CliResult<RecordDto>              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Printer: table / record view, or JSON with --json                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each command takes the [`AppContext`] and returns data; printing stays
//! in [`dispatch`] so the commands are testable without capturing stdout.

pub mod auth;
pub mod record;
pub mod resolve;
pub mod scan;
pub mod search;
pub mod stock;

use stockroom_scan::{ScanConfig, WedgeReader};
use stockroom_vendor::SystemBrowser;
use tokio::io::BufReader;

use crate::cli::{AuthAction, Command};
use crate::error::CliResult;
use crate::output::Printer;
use crate::state::AppContext;

/// Runs one parsed command against the context.
pub async fn dispatch(ctx: &AppContext, command: Command, printer: &Printer) -> CliResult<()> {
    match command {
        Command::Add { barcode, fields } => printer.record(&record::add(ctx, barcode, &fields).await?),
        Command::Edit { barcode, fields } => printer.record(&record::edit(ctx, &barcode, &fields).await?),
        Command::Show { barcode } => printer.record(&record::show(ctx, &barcode).await?),
        Command::Delete { barcode, yes } => {
            record::delete(ctx, &barcode, yes).await?;
            printer.message(&format!("deleted {}", barcode))
        }
        Command::Recent { limit } => {
            let records = search::recent(ctx, limit).await?;
            let total = ctx.db().components().count().await?;
            printer.listing(&records, total)
        }
        Command::Search { keyword } => {
            printer.records(&search::search(ctx, keyword.as_deref().unwrap_or("")).await?)
        }
        Command::AdvSearch { terms } => printer.records(&search::advanced_search(ctx, &terms).await?),
        Command::Checkout { barcode, qty, project } => {
            printer.record(&stock::checkout(ctx, &barcode, qty, &project).await?)
        }
        Command::Checkin { barcode, qty } => printer.record(&stock::checkin(ctx, &barcode, qty).await?),
        Command::Resolve { barcode } => printer.resolution(resolve::resolve(ctx, &barcode).await?),
        Command::Scan { location, camera, count } => {
            let options = scan::ScanOptions { location, count };
            match camera {
                Some(index) => {
                    let (source, decoder) = scan::open_camera(index)?;
                    scan::run_camera(ctx, source, decoder, ScanConfig::default(), &options, |outcome| {
                        printer.scan(outcome)
                    })
                    .await?;
                }
                None => {
                    let mut reader = WedgeReader::new(BufReader::new(tokio::io::stdin()));
                    scan::run_wedge(ctx, &mut reader, &options, |outcome| printer.scan(outcome)).await?;
                }
            }
            Ok(())
        }
        Command::Auth { action } => {
            let status = match action {
                AuthAction::Login => auth::login(ctx, &SystemBrowser).await?,
                AuthAction::Status => auth::status(ctx).await?,
                AuthAction::Logout => auth::logout(ctx).await?,
            };
            printer.auth(&status)
        }
    }
}
