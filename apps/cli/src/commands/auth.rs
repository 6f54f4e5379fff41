//! # Vendor Authorization Commands
//!
//! `auth login` runs the browser round trip; `auth status` reports the
//! stored token state; `auth logout` forgets the tokens.

use serde::Serialize;
use stockroom_vendor::{AuthState, BrowserLauncher, VendorConfig};

use crate::error::CliResult;
use crate::state::AppContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub state: AuthState,
    pub credentials_configured: bool,
    pub access_expires: Option<String>,
    pub refresh_expires: Option<String>,
    pub config_path: Option<String>,
}

impl AuthStatus {
    fn new(state: AuthState, config: &VendorConfig) -> Self {
        AuthStatus {
            state,
            credentials_configured: config.credentials().is_complete(),
            access_expires: config.tokens.access_expiry.map(|t| t.to_string()),
            refresh_expires: config.tokens.refresh_expiry.map(|t| t.to_string()),
            config_path: config.path().map(|p| p.display().to_string()),
        }
    }
}

/// Opens the consent page and waits for the redirect.
pub async fn login(ctx: &AppContext, browser: &dyn BrowserLauncher) -> CliResult<AuthStatus> {
    let state = ctx.vendor().authorize(browser).await?;
    let config = ctx.vendor().config().await;
    Ok(AuthStatus::new(state, &config))
}

pub async fn status(ctx: &AppContext) -> CliResult<AuthStatus> {
    let state = ctx.vendor().auth_state().await;
    let config = ctx.vendor().config().await;
    Ok(AuthStatus::new(state, &config))
}

pub async fn logout(ctx: &AppContext) -> CliResult<AuthStatus> {
    ctx.vendor().logout().await?;
    status(ctx).await
}
