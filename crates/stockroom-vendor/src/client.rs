//! # Vendor Client
//!
//! Owns the vendor config (credentials + tokens), keeps the access token
//! fresh and performs authenticated lookups.
//!
//! ## Token Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ensure_access_token()                                                  │
//! │                                                                         │
//! │   read lock ── Authorized ──────────────────────────► access token      │
//! │       │                                                                 │
//! │       └─ AccessExpired ─► write lock ─► re-check ─► refresh ─► persist  │
//! │                                                                         │
//! │   Unauthorized / RefreshExpired ───────────────► AuthorizationRequired  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every successful exchange or refresh is written to the config file
//! before the new access token is handed out.

use chrono::{DateTime, Utc};
use reqwest::header;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stockroom_core::{Barcode, VendorProduct};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::BrowserLauncher;
use crate::config::VendorConfig;
use crate::error::{VendorError, VendorResult};
use crate::oauth::{self, VendorErrorBody};
use crate::redirect::{Callback, PageOutcome, RedirectListener};
use crate::token::{AuthState, TokenPair};

/// Lookup path, relative to the API base.
pub const PRODUCT_2D_BARCODE_PATH: &str = "/Barcoding/v3/Product2DBarcodes/";

/// Vendor API client.
///
/// Cheap to clone; clones share the same config and token state.
#[derive(Clone)]
pub struct VendorClient {
    http: reqwest::Client,
    config: Arc<RwLock<VendorConfig>>,
    /// Set while a redirect listener is waiting.
    pending: Arc<AtomicBool>,
}

impl VendorClient {
    pub fn new(config: VendorConfig) -> VendorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .user_agent(concat!("stockroom/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(VendorClient {
            http,
            config: Arc::new(RwLock::new(config)),
            pending: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Snapshot of the current config.
    pub async fn config(&self) -> VendorConfig {
        self.config.read().await.clone()
    }

    pub async fn auth_state(&self) -> AuthState {
        self.auth_state_at(Utc::now()).await
    }

    pub async fn auth_state_at(&self, now: DateTime<Utc>) -> AuthState {
        if self.pending.load(Ordering::SeqCst) {
            return AuthState::PendingRedirect;
        }
        self.config.read().await.tokens.state(now)
    }

    // =========================================================================
    // Interactive Authorization
    // =========================================================================

    /// Runs the authorization-code flow.
    ///
    /// Starts the redirect listener, sends the user to the consent page and
    /// waits for the redirect. Requests carrying neither a code nor an error
    /// are ignored. A denied consent or a failed code exchange keeps the
    /// listener up for the retry link until the redirect timeout, which then
    /// reports the last failure. The listener is torn down before returning.
    pub async fn authorize(&self, launcher: &dyn BrowserLauncher) -> VendorResult<AuthState> {
        let (client, redirect, base) = {
            let cfg = self.config.read().await;
            (cfg.credentials(), cfg.redirect.clone(), cfg.api_base())
        };

        if !client.is_complete() {
            return Err(VendorError::MissingCredentials);
        }

        let mut listener = RedirectListener::bind(&redirect).await?;
        self.pending.store(true, Ordering::SeqCst);

        let redirect_uri = redirect.uri_for_port(listener.local_addr().port());
        let result = async {
            let consent_url = oauth::authorize_url(&base, &client.id, &redirect_uri)?;
            listener.set_retry_url(consent_url.clone()).await;

            info!(url = %consent_url, "Waiting for vendor authorization");
            if let Err(e) = launcher.open(&consent_url) {
                warn!(error = %e, "Open the consent URL manually: {}", consent_url);
            }

            let deadline = Instant::now() + Duration::from_secs(redirect.timeout_secs);
            let mut last_failure = None;

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let callback = match listener.next_callback(remaining).await {
                    Ok(callback) => callback,
                    Err(VendorError::AuthorizationTimeout(secs)) => {
                        return Err(last_failure.unwrap_or(VendorError::AuthorizationTimeout(secs)));
                    }
                    Err(e) => return Err(e),
                };

                let failure = match callback {
                    Callback::Denied { error, description } => VendorError::AuthorizationDenied { error, description },
                    Callback::Code { code, reply } => {
                        let outcome = self.complete_authorization(&code, &redirect_uri).await;
                        let _ = reply.send(page_for(&outcome));
                        match outcome {
                            Ok(state) => return Ok(state),
                            Err(e) => e,
                        }
                    }
                };

                // The failure page links back to the consent URL; keep
                // listening for the retry until the deadline.
                warn!(error = %failure, "Authorization attempt failed, waiting for a retry");
                last_failure = Some(failure);
            }
        }
        .await;

        self.pending.store(false, Ordering::SeqCst);
        listener.shutdown().await;

        match &result {
            Ok(state) => info!(state = %state, "Vendor authorization complete"),
            Err(e) => warn!(error = %e, "Vendor authorization failed"),
        }
        result
    }

    /// Exchanges an authorization code and persists the resulting tokens.
    pub async fn complete_authorization(&self, code: &str, redirect_uri: &str) -> VendorResult<AuthState> {
        let mut cfg = self.config.write().await;
        let base = cfg.api_base();

        let grant = oauth::exchange_code(&self.http, &base, &cfg.credentials(), code, redirect_uri).await?;
        let now = Utc::now();
        cfg.tokens = TokenPair::from_grant(&grant, now);
        persist(&cfg);

        Ok(cfg.tokens.state(now))
    }

    /// Forgets stored tokens.
    pub async fn logout(&self) -> VendorResult<()> {
        let mut cfg = self.config.write().await;
        cfg.tokens.clear();
        if cfg.path().is_some() {
            cfg.save()?;
        }
        info!("Vendor tokens cleared");
        Ok(())
    }

    // =========================================================================
    // Token Freshness
    // =========================================================================

    /// Returns a usable access token, refreshing it silently if needed.
    ///
    /// ## Returns
    /// * `AuthorizationRequired` - no tokens, or the refresh token expired
    /// * `TokenRejected` - the vendor refused the refresh; tokens are cleared
    pub async fn ensure_access_token(&self) -> VendorResult<String> {
        self.ensure_access_token_at(Utc::now()).await
    }

    pub async fn ensure_access_token_at(&self, now: DateTime<Utc>) -> VendorResult<String> {
        {
            let cfg = self.config.read().await;
            match cfg.tokens.state(now) {
                AuthState::Authorized => {
                    debug!("Using cached access token");
                    return Ok(cfg.tokens.access_token.clone());
                }
                AuthState::AccessExpired => {}
                _ => return Err(VendorError::AuthorizationRequired),
            }
        }

        let mut cfg = self.config.write().await;

        // Double-check after acquiring write lock
        match cfg.tokens.state(now) {
            AuthState::Authorized => return Ok(cfg.tokens.access_token.clone()),
            AuthState::AccessExpired => {}
            _ => return Err(VendorError::AuthorizationRequired),
        }

        let credentials = cfg.credentials();
        if !credentials.is_complete() {
            return Err(VendorError::MissingCredentials);
        }

        info!("Access token expired, refreshing");
        let base = cfg.api_base();
        match oauth::refresh(&self.http, &base, &credentials, &cfg.tokens.refresh_token).await {
            Ok(grant) => {
                cfg.tokens = TokenPair::from_grant(&grant, now);
                persist(&cfg);
                info!(expires = ?cfg.tokens.access_expiry, "Access token refreshed");
                Ok(cfg.tokens.access_token.clone())
            }
            Err(e @ VendorError::TokenRejected { .. }) => {
                warn!(error = %e, "Refresh token rejected, clearing tokens");
                cfg.tokens.clear();
                persist(&cfg);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Looks up product details for a scanned 2D barcode payload.
    pub async fn product_2d_barcode(&self, barcode: &Barcode) -> VendorResult<VendorProduct> {
        let access_token = self.ensure_access_token().await?;
        let (base, client_id) = {
            let cfg = self.config.read().await;
            (cfg.api_base(), cfg.credentials().id)
        };

        let encoded: String = url::form_urlencoded::byte_serialize(barcode.as_bytes()).collect();
        let url = format!("{}{}{}", base, PRODUCT_2D_BARCODE_PATH, encoded);

        debug!(barcode = %barcode, "Looking up 2D barcode");
        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&access_token)
            .header("X-DIGIKEY-Client-Id", client_id)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = VendorErrorBody::parse(&text);
            warn!(status = status.as_u16(), message = %body.message, "2D barcode lookup failed");
            return Err(VendorError::Api {
                status: status.as_u16(),
                message: body.message,
                details: body.details,
            });
        }

        let product: VendorProduct = serde_json::from_str(&text)?;
        debug!(part = %product.vendor_part_number, "2D barcode resolved");
        Ok(product)
    }
}

fn page_for(outcome: &VendorResult<AuthState>) -> PageOutcome {
    match outcome {
        Ok(_) => PageOutcome::Success,
        Err(VendorError::TokenRejected {
            status,
            message,
            details,
        }) => PageOutcome::Failed {
            status: *status,
            message: message.clone(),
            details: details.clone(),
        },
        Err(e) => PageOutcome::Failed {
            status: 0,
            message: e.to_string(),
            details: String::new(),
        },
    }
}

fn persist(cfg: &VendorConfig) {
    if cfg.path().is_none() {
        debug!("No config path, tokens kept in memory only");
        return;
    }
    if let Err(e) = cfg.save() {
        warn!(error = %e, "Failed to persist vendor tokens");
    }
}
