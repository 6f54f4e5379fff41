//! # Vendor Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Vendor Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌──────────────────────┐  ┌─────────────────────┐ │
//! │  │  Configuration  │  │   Authorization      │  │     Transport       │ │
//! │  │                 │  │                      │  │                     │ │
//! │  │  InvalidConfig  │  │  AuthorizationReq'd  │  │  Http               │ │
//! │  │  MissingCreds   │  │  AuthorizationDenied │  │  Timeout            │ │
//! │  │  ConfigLoad/Save│  │  AuthorizationTimeout│  │  Api (status)       │ │
//! │  │  InvalidUrl     │  │  TokenRejected       │  │  Decode             │ │
//! │  └─────────────────┘  └──────────────────────┘  └─────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │  Local listener │  Listener, Tls, BrowserLaunch                      │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for vendor operations.
pub type VendorResult<T> = Result<T, VendorError>;

#[derive(Debug, Error)]
pub enum VendorError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid vendor configuration: {0}")]
    InvalidConfig(String),

    /// No client id/secret. The admin has to register an application with
    /// the vendor and put the credentials in the config file.
    #[error("Vendor client credentials missing. Register an application with the vendor and set [client] id/secret in the config file")]
    MissingCredentials,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    /// Both tokens have expired (or never existed); the user must log in.
    #[error("Vendor authorization required. Run `stockroom auth login`")]
    AuthorizationRequired,

    /// The consent page redirected back with `error=...`.
    #[error("Authorization denied: {error}{}", paren_suffix(.description))]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    /// No redirect arrived in time.
    #[error("No authorization redirect received within {0} seconds")]
    AuthorizationTimeout(u64),

    /// Token endpoint refused the code or refresh token.
    #[error("Token request rejected ({status}): {message}{}", dash_suffix(.details))]
    TokenRejected {
        status: u16,
        message: String,
        details: String,
    },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Vendor API error ({status}): {message}{}", dash_suffix(.details))]
    Api {
        status: u16,
        message: String,
        details: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Vendor request timed out")]
    Timeout,

    #[error("Unexpected response body: {0}")]
    Decode(String),

    // =========================================================================
    // Local Listener Errors
    // =========================================================================
    #[error("Redirect listener failed: {0}")]
    Listener(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Could not open browser: {0}")]
    BrowserLaunch(String),
}

fn paren_suffix(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

fn dash_suffix(details: &str) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(" - {}", details)
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for VendorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VendorError::Timeout
        } else if err.is_decode() {
            VendorError::Decode(err.to_string())
        } else {
            VendorError::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for VendorError {
    fn from(err: url::ParseError) -> Self {
        VendorError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for VendorError {
    fn from(err: serde_json::Error) -> Self {
        VendorError::Decode(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for VendorError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        VendorError::Http(format!("form encoding failed: {}", err))
    }
}

impl From<std::io::Error> for VendorError {
    fn from(err: std::io::Error) -> Self {
        VendorError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for VendorError {
    fn from(err: toml::de::Error) -> Self {
        VendorError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for VendorError {
    fn from(err: toml::ser::Error) -> Self {
        VendorError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl VendorError {
    /// The user has to go through the consent page before retrying.
    pub fn is_auth_required(&self) -> bool {
        matches!(
            self,
            VendorError::AuthorizationRequired | VendorError::TokenRejected { .. }
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            VendorError::InvalidConfig(_)
                | VendorError::MissingCredentials
                | VendorError::InvalidUrl(_)
                | VendorError::ConfigLoadFailed(_)
                | VendorError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(VendorError::AuthorizationRequired.is_auth_required());
        assert!(!VendorError::Timeout.is_auth_required());
        assert!(VendorError::MissingCredentials.is_config_error());
    }

    #[test]
    fn test_display_includes_vendor_details() {
        let err = VendorError::TokenRejected {
            status: 401,
            message: "Invalid grant".into(),
            details: "The refresh token has expired".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("refresh token has expired"));

        let denied = VendorError::AuthorizationDenied {
            error: "access_denied".into(),
            description: Some("user cancelled".into()),
        };
        assert_eq!(denied.to_string(), "Authorization denied: access_denied (user cancelled)");
    }
}
