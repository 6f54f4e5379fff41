//! # Barcode Resolution
//!
//! Turns a scanned payload into something the user can edit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  payload                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  stored? ──yes──► Existing(record)        (editable, deletable)         │
//! │     │                                                                   │
//! │     no                                                                  │
//! │     ├── mode = local  ──► Draft(1P → mfg P/N, Q → quantity)             │
//! │     └── mode = vendor ──► 2D-barcode lookup ──► Draft(vendor fields)    │
//! │                              │                                          │
//! │                              └─ error ──► hint: try --mode local        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drafts carry the payload as their barcode and leave the location empty;
//! nothing is written until the user saves.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use stockroom_core::payload::{draft_from_label, draft_from_vendor};
use stockroom_core::{Barcode, ComponentRecord};
use tracing::{debug, info};

use crate::error::{CliError, CliResult};
use crate::state::AppContext;

/// How unknown payloads are turned into drafts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Parse the tags printed in the payload itself.
    #[default]
    Local,
    /// Ask the vendor API.
    Vendor,
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecodeMode::Local => "local",
            DecodeMode::Vendor => "vendor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already in the store.
    Existing(ComponentRecord),
    /// New part; fields pre-filled, not yet saved.
    Draft(ComponentRecord),
}

impl Resolution {
    pub fn record(&self) -> &ComponentRecord {
        match self {
            Resolution::Existing(r) | Resolution::Draft(r) => r,
        }
    }

    pub fn into_record(self) -> ComponentRecord {
        match self {
            Resolution::Existing(r) | Resolution::Draft(r) => r,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Resolution::Existing(_))
    }
}

/// Resolves a payload against the store, then the configured decode mode.
pub async fn resolve(ctx: &AppContext, barcode: &Barcode) -> CliResult<Resolution> {
    if barcode.is_empty() {
        return Err(CliError::validation("Empty barcode payload"));
    }

    if let Some(record) = ctx.db().components().get_by_barcode(barcode).await? {
        debug!(barcode = %barcode, "Payload already stored");
        return Ok(Resolution::Existing(record));
    }

    let draft = match ctx.mode() {
        DecodeMode::Local => draft_from_label(barcode),
        DecodeMode::Vendor => {
            let product = ctx.vendor().product_2d_barcode(barcode).await.map_err(|e| {
                CliError::from(e).with_hint("switch to local decoding with `--mode local` to fill the record from the label")
            })?;
            draft_from_vendor(barcode, &product)
        }
    };

    info!(barcode = %barcode, mode = %ctx.mode(), "New component drafted");
    Ok(Resolution::Draft(draft))
}
