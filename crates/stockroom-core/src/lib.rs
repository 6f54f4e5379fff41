//! # stockroom-core: Domain Rules for the Stockroom
//!
//! Everything the inventory tool knows about components, independent of
//! where records are stored or how barcodes are read.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    stockroom CLI (apps/cli)                     │   │
//! │  │    scan ──► resolve ──► save / checkout / checkin / delete      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockroom-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  payload  │  │   stock   │  │ validation│  │   │
//! │  │   │ Component │  │  GS tags  │  │ checkout  │  │ save rules│  │   │
//! │  │   │  Barcode  │  │  drafts   │  │  checkin  │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          stockroom-db / stockroom-vendor / stockroom-scan       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `ComponentRecord`, `Barcode`, `VendorProduct`
//! - [`payload`] - Group-separator tag extraction and record drafts
//! - [`search`] - Search fields and predicate lists
//! - [`stock`] - Checkout / checkin arithmetic
//! - [`validation`] - Save rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::payload::{extract_fields, tags, GS};
//!
//! let payload = b"[)>\x1e06\x1dP296-1234-ND\x1d1P12345\x1dQ10\x1d";
//! let fields = extract_fields(payload, &[tags::MANUFACTURER_PART, tags::QUANTITY], GS);
//!
//! assert_eq!(fields[tags::MANUFACTURER_PART], "12345");
//! assert_eq!(fields[tags::QUANTITY], "10");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod payload;
pub mod search;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use search::{Conjunction, SearchClause, SearchField, SearchQuery};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum rows returned by a search (basic or advanced).
pub const SEARCH_LIMIT: u32 = 200;

/// Rows shown in the "recently added" listing.
pub const RECENT_LIMIT: u32 = 50;

/// Digits in a synthetic barcode (`0000042`).
pub const SYNTHETIC_BARCODE_WIDTH: usize = 7;

/// Supplier name written on records resolved through the vendor API.
pub const VENDOR_SUPPLIER_NAME: &str = "Digi-Key";
