//! # Token Lifecycle
//!
//! The vendor issues a short-lived access token and a long-lived refresh
//! token. Both expiries are stored as absolute UTC timestamps, pulled in by
//! [`EXPIRY_MARGIN_SECS`] so a token is never used in its last seconds.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Unauthorized ──login──► PendingRedirect ──code──► Authorized          │
//! │        ▲                        │ error/timeout          │              │
//! │        │                        ▼                        │ now > access │
//! │        │                   Unauthorized                  ▼              │
//! │        │                                          AccessExpired         │
//! │        │                                           │          │         │
//! │        │                      refresh (silent) ◄───┘          │         │
//! │        │                             │                        │ now >   │
//! │        │                             ▼                        │ refresh │
//! │        │                        Authorized                    ▼         │
//! │        └──────────────────────────────────────────── RefreshExpired     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds knocked off every expiry the vendor reports.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

// =============================================================================
// Token Grant (wire format)
// =============================================================================

/// Body of a successful token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_expires_in: i64,
}

// =============================================================================
// Token Pair (persisted)
// =============================================================================

/// Tokens and their absolute expiries, as kept in the config file.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_expiry: Option<DateTime<Utc>>,

    #[serde(default)]
    pub refresh_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expiry: Option<DateTime<Utc>>,
}

impl TokenPair {
    /// Converts a grant received at `now` into stored tokens.
    pub fn from_grant(grant: &TokenGrant, now: DateTime<Utc>) -> Self {
        let margin = Duration::seconds(EXPIRY_MARGIN_SECS);
        TokenPair {
            access_token: grant.access_token.clone(),
            access_expiry: Some(now + Duration::seconds(grant.expires_in) - margin),
            refresh_token: grant.refresh_token.clone(),
            refresh_expiry: Some(now + Duration::seconds(grant.refresh_token_expires_in) - margin),
        }
    }

    pub fn access_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.access_expiry.is_some_and(|exp| now <= exp)
    }

    pub fn refresh_valid(&self, now: DateTime<Utc>) -> bool {
        !self.refresh_token.is_empty() && self.refresh_expiry.is_some_and(|exp| now <= exp)
    }

    /// Where these tokens sit in the lifecycle at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> AuthState {
        if self.access_token.is_empty() && self.refresh_token.is_empty() {
            return AuthState::Unauthorized;
        }
        if !self.refresh_valid(now) {
            return AuthState::RefreshExpired;
        }
        if !self.access_valid(now) {
            return AuthState::AccessExpired;
        }
        AuthState::Authorized
    }

    /// Forgets both tokens.
    pub fn clear(&mut self) {
        *self = TokenPair::default();
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &redact(&self.access_token))
            .field("access_expiry", &self.access_expiry)
            .field("refresh_token", &redact(&self.refresh_token))
            .field("refresh_expiry", &self.refresh_expiry)
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() {
        "<none>"
    } else {
        "<redacted>"
    }
}

// =============================================================================
// Auth State
// =============================================================================

/// Authorization state of the vendor client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No tokens at all.
    Unauthorized,
    /// Listener is up, waiting for the browser to come back.
    PendingRedirect,
    /// Access token usable.
    Authorized,
    /// Access token stale, refresh token still good.
    AccessExpired,
    /// Both tokens stale; interactive login required.
    RefreshExpired,
}

impl AuthState {
    /// Whether an API call can proceed without user interaction.
    pub fn can_call_api(&self) -> bool {
        matches!(self, AuthState::Authorized | AuthState::AccessExpired)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthState::Unauthorized => "unauthorized",
            AuthState::PendingRedirect => "pending redirect",
            AuthState::Authorized => "authorized",
            AuthState::AccessExpired => "access token expired (will refresh)",
            AuthState::RefreshExpired => "refresh token expired (login required)",
        };
        f.write_str(s)
    }
}
