//! # stockroom-vendor: Distributor API Client
//!
//! OAuth2 authorization-code client for the distributor's API, plus the
//! 2D-barcode product lookup used to fill in records for scanned bags.
//!
//! ## Modules
//!
//! - [`config`] - `vendor.toml`: credentials, persisted tokens, endpoints
//! - [`token`] - Expiry arithmetic and [`AuthState`]
//! - [`oauth`] - Token endpoint grants
//! - [`redirect`] - One-shot local redirect listener
//! - [`browser`] - Opening the consent page
//! - [`client`] - [`VendorClient`]
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use stockroom_vendor::{SystemBrowser, VendorClient, VendorConfig};
//!
//! let client = VendorClient::new(VendorConfig::load(None)?)?;
//! if !client.auth_state().await.can_call_api() {
//!     client.authorize(&SystemBrowser).await?;
//! }
//! let product = client.product_2d_barcode(&barcode).await?;
//! ```

pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod redirect;
pub mod token;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use client::VendorClient;
pub use config::VendorConfig;
pub use error::{VendorError, VendorResult};
pub use token::{AuthState, TokenPair};
