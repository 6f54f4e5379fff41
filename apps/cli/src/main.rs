//! # Stockroom Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          stockroom (bin)                                │
//! │                                                                         │
//! │  main.rs ────► tokio runtime, hands off to stockroom_cli::run()         │
//! │  lib.rs ─────► logging, arguments, AppContext, dispatch                 │
//! │  commands/ ──► add, search, checkout, resolve, scan, auth ...           │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite inventory.db          vendor.toml (credentials, tokens)  │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // The actual setup is in lib.rs for testability
    stockroom_cli::run().await
}
