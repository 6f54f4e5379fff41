//! # Application Context
//!
//! Everything a command needs, built once at startup and passed
//! explicitly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AppContext                                                             │
//! │  ┌──────────────────┐ ┌──────────────────────┐ ┌─────────────────────┐  │
//! │  │  Database        │ │  VendorClient        │ │  DecodeMode         │  │
//! │  │  • SQLite pool   │ │  • vendor.toml       │ │  • local / vendor   │  │
//! │  │  • repositories  │ │  • token refresh     │ │                     │  │
//! │  └──────────────────┘ └──────────────────────┘ └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use tracing::info;

use stockroom_db::{Database, DbConfig};
use stockroom_vendor::{VendorClient, VendorConfig};

use crate::commands::resolve::DecodeMode;
use crate::error::CliResult;

/// Where things live and how payloads are resolved.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub db_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub mode: DecodeMode,
}

pub struct AppContext {
    db: Database,
    vendor: VendorClient,
    mode: DecodeMode,
}

impl AppContext {
    /// Opens the database (running migrations) and loads the vendor config.
    pub async fn open(settings: &AppSettings) -> CliResult<Self> {
        if let Some(parent) = settings.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::new(DbConfig::new(&settings.db_path)).await?;
        info!(path = ?settings.db_path, "Database connected and migrations applied");

        let vendor_config = VendorConfig::load_or_default(settings.config_path.clone());
        let vendor = VendorClient::new(vendor_config)?;

        Ok(AppContext::new(db, vendor, settings.mode))
    }

    pub fn new(db: Database, vendor: VendorClient, mode: DecodeMode) -> Self {
        AppContext { db, vendor, mode }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn vendor(&self) -> &VendorClient {
        &self.vendor
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory database and a vendor client with no credentials.
    pub(crate) async fn test_context(mode: DecodeMode) -> AppContext {
        test_context_with(mode, VendorConfig::default()).await
    }

    /// In-memory database and a vendor client over `config`.
    pub(crate) async fn test_context_with(mode: DecodeMode, config: VendorConfig) -> AppContext {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let vendor = VendorClient::new(config).unwrap();
        AppContext::new(db, vendor, mode)
    }
}
