//! # Vendor Configuration
//!
//! Client credentials, persisted tokens and endpoint settings, kept in one
//! TOML file that the client rewrites every time it obtains new tokens.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_CLIENT_ID / STOCKROOM_CLIENT_SECRET                      │
//! │     STOCKROOM_API_BASE                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $STOCKROOM_CONFIG_PATH, or                                         │
//! │     ~/.config/stockroom/vendor.toml (Linux)                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Environment values live beside the file values and are never written
//! back; [`VendorConfig::save`] persists only what came from the file plus
//! the tokens. The file is created owner-only on unix.
//!
//! ## Configuration File Format
//! ```toml
//! [client]
//! id = "..."
//! secret = "..."
//!
//! [tokens]                       # written by the client
//! access_token = "..."
//! access_expiry = "2026-10-16T12:29:50Z"
//! refresh_token = "..."
//! refresh_expiry = "2027-01-14T11:59:50Z"
//!
//! [api]
//! sandbox = false
//! timeout_secs = 30
//!
//! [redirect]
//! port = 4443
//! cert_path = "/home/lab/.config/stockroom/redirect-cert.pem"
//! key_path = "/home/lab/.config/stockroom/redirect-key.pem"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{VendorError, VendorResult};
use crate::token::TokenPair;

/// Production API host.
pub const PRODUCTION_BASE_URL: &str = "https://api.digikey.com";

/// Sandbox API host.
pub const SANDBOX_BASE_URL: &str = "https://sandbox-api.digikey.com";

/// Fixed redirect port registered with the vendor application.
pub const DEFAULT_REDIRECT_PORT: u16 = 4443;

// =============================================================================
// Client Credentials
// =============================================================================

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ClientCredentials {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub secret: String,
}

impl ClientCredentials {
    pub fn is_complete(&self) -> bool {
        !self.id.trim().is_empty() && !self.secret.trim().is_empty()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &if self.secret.is_empty() { "<none>" } else { "<redacted>" })
            .finish()
    }
}

// =============================================================================
// Environment Overrides
// =============================================================================

/// Values read from the environment at load time.
#[derive(Clone, Default)]
struct EnvOverrides {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base: Option<String>,
}

impl fmt::Debug for EnvOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvOverrides")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

// =============================================================================
// API Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Overrides the host entirely (tests, proxies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Use the vendor sandbox instead of production.
    #[serde(default)]
    pub sandbox: bool,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: None,
            sandbox: false,
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiSettings {
    /// Host all endpoints hang off, without a trailing slash.
    pub fn effective_base(&self) -> String {
        let base = match (&self.base_url, self.sandbox) {
            (Some(url), _) => url.as_str(),
            (None, true) => SANDBOX_BASE_URL,
            (None, false) => PRODUCTION_BASE_URL,
        };
        base.trim_end_matches('/').to_string()
    }
}

// =============================================================================
// Redirect Listener Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_redirect_port")]
    pub port: u16,

    /// Serve HTTPS. The vendor only accepts https redirect URIs.
    #[serde(default = "default_true")]
    pub tls: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// How long to wait for the browser to come back.
    #[serde(default = "default_redirect_timeout")]
    pub timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

fn default_true() -> bool {
    true
}

fn default_redirect_timeout() -> u64 {
    300
}

impl Default for RedirectSettings {
    fn default() -> Self {
        RedirectSettings {
            bind_addr: default_bind_addr(),
            port: default_redirect_port(),
            tls: true,
            cert_path: None,
            key_path: None,
            timeout_secs: default_redirect_timeout(),
        }
    }
}

impl RedirectSettings {
    /// Redirect URI registered with the vendor, e.g. `https://127.0.0.1:4443`.
    pub fn redirect_uri(&self) -> String {
        self.uri_for_port(self.port)
    }

    /// Same, for a listener that ended up on a different port.
    pub fn uri_for_port(&self, port: u16) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.bind_addr, port)
    }
}

// =============================================================================
// Vendor Config (root)
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default)]
    pub client: ClientCredentials,

    #[serde(default)]
    pub tokens: TokenPair,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub redirect: RedirectSettings,

    /// File this config was loaded from and is saved back to.
    #[serde(skip)]
    path: Option<PathBuf>,

    #[serde(skip)]
    env: EnvOverrides,

    /// Why the file at `path` must not be overwritten.
    #[serde(skip)]
    save_blocked: Option<String>,
}

impl VendorConfig {
    /// Loads from `config_path` (or the default location), applies
    /// environment overrides and validates.
    ///
    /// A missing file is not an error: defaults are used and the file is
    /// created on the first save.
    pub fn load(config_path: Option<PathBuf>) -> VendorResult<Self> {
        let path = config_path.or_else(Self::default_config_path);
        let mut config = Self::default();

        if let Some(ref path) = path {
            if path.exists() {
                info!(?path, "Loading vendor config");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Vendor config not found, using defaults");
            }
        }

        config.path = path;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Like [`load`](Self::load) but falls back to defaults on error.
    ///
    /// The fallback keeps the path for display but refuses to save over it,
    /// so a file that failed to load is never replaced by defaults.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path.clone()).unwrap_or_else(|e| {
            warn!("Failed to load vendor config: {}. Using defaults.", e);
            let mut config = Self::default().with_path(config_path.or_else(Self::default_config_path));
            config.apply_overrides(|key| std::env::var(key).ok());
            config.save_blocked = Some(e.to_string());
            config
        })
    }

    /// Writes the file-sourced settings and the tokens back to the file
    /// they came from. Environment overrides are not written.
    pub fn save(&self) -> VendorResult<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| VendorError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(reason) = &self.save_blocked {
            return Err(VendorError::ConfigSaveFailed(format!(
                "{} was not loaded ({}); fix or remove it first",
                path.display(),
                reason
            )));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VendorError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        write_private(path, &contents).map_err(|e| VendorError::ConfigSaveFailed(e.to_string()))?;

        debug!(?path, "Vendor config saved");
        Ok(())
    }

    /// Credentials in effect: environment first, then the file.
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            id: self.env.client_id.clone().unwrap_or_else(|| self.client.id.clone()),
            secret: self
                .env
                .client_secret
                .clone()
                .unwrap_or_else(|| self.client.secret.clone()),
        }
    }

    /// API host in effect, without a trailing slash.
    pub fn api_base(&self) -> String {
        match &self.env.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => self.api.effective_base(),
        }
    }

    /// Sets the file used by [`save`](Self::save).
    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn validate(&self) -> VendorResult<()> {
        let base = self.api_base();
        let url = url::Url::parse(&base)?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(VendorError::InvalidUrl(format!(
                "API base must be http(s), got: {}",
                base
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(VendorError::InvalidConfig("api.timeout_secs must be greater than 0".into()));
        }

        if self.redirect.timeout_secs == 0 {
            return Err(VendorError::InvalidConfig(
                "redirect.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(id) = var("STOCKROOM_CLIENT_ID") {
            debug!("Overriding client id from environment");
            self.env.client_id = Some(id);
        }

        self.env.client_secret = var("STOCKROOM_CLIENT_SECRET");

        if let Some(base) = var("STOCKROOM_API_BASE") {
            debug!(base = %base, "Overriding API base from environment");
            self.env.api_base = Some(base);
        }
    }

    /// `$STOCKROOM_CONFIG_PATH`, else `<config dir>/vendor.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("STOCKROOM_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }
        directories::ProjectDirs::from("org", "stockroom", "stockroom")
            .map(|dirs| dirs.config_dir().join("vendor.toml"))
    }
}

/// Writes `contents`, creating the file readable by the owner only.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenGrant;
    use chrono::Utc;

    #[test]
    fn test_default_config() {
        let config = VendorConfig::default();
        assert_eq!(config.api.effective_base(), PRODUCTION_BASE_URL);
        assert_eq!(config.redirect.redirect_uri(), "https://127.0.0.1:4443");
        assert!(!config.client.is_complete());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sandbox_and_override_base() {
        let mut api = ApiSettings {
            sandbox: true,
            ..Default::default()
        };
        assert_eq!(api.effective_base(), SANDBOX_BASE_URL);

        api.base_url = Some("http://127.0.0.1:9000/".into());
        assert_eq!(api.effective_base(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_validation_rejects_bad_base() {
        let mut config = VendorConfig::default();
        config.api.base_url = Some("ftp://example.com".into());
        assert!(config.validate().is_err());

        config.api.base_url = Some("not a url".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vendor.toml");

        let mut config = VendorConfig::default().with_path(Some(path.clone()));
        config.client = ClientCredentials {
            id: "client-id".into(),
            secret: "client-secret".into(),
        };
        config.tokens = TokenPair::from_grant(
            &TokenGrant {
                access_token: "acc".into(),
                refresh_token: "ref".into(),
                expires_in: 1800,
                refresh_token_expires_in: 86400,
            },
            Utc::now(),
        );
        config.save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[client]"));
        assert!(text.contains("[tokens]"));

        let reloaded = VendorConfig::load(Some(path)).unwrap();
        assert_eq!(reloaded.tokens, config.tokens);
        assert!(reloaded.client.is_complete());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = VendorConfig::load(Some(path.clone())).unwrap();
        assert_eq!(config.path(), Some(&path));
        assert_eq!(config.redirect.port, DEFAULT_REDIRECT_PORT);
    }

    #[test]
    fn test_save_without_path_fails() {
        assert!(matches!(
            VendorConfig::default().save(),
            Err(VendorError::ConfigSaveFailed(_))
        ));
    }

    #[test]
    fn test_environment_values_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor.toml");
        std::fs::write(&path, "[client]\nid = \"file-id\"\n").unwrap();

        let mut config = VendorConfig::load(Some(path.clone())).unwrap();
        config.apply_overrides(|key| match key {
            "STOCKROOM_CLIENT_SECRET" => Some("env-only-secret".into()),
            "STOCKROOM_API_BASE" => Some("http://127.0.0.1:9/".into()),
            _ => None,
        });

        assert_eq!(config.credentials().id, "file-id");
        assert_eq!(config.credentials().secret, "env-only-secret");
        assert_eq!(config.api_base(), "http://127.0.0.1:9");

        config.save().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("file-id"));
        assert!(!text.contains("env-only-secret"));
        assert!(!text.contains("127.0.0.1:9"));

        let reloaded = VendorConfig::load(Some(path)).unwrap();
        assert_eq!(reloaded.client.secret, "");
        assert_eq!(reloaded.api.base_url, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor.toml");
        VendorConfig::default().with_path(Some(path.clone())).save().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_unreadable_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor.toml");
        let original = "[client]\nid = \"keep-me\"\nsecret = [broken\n";
        std::fs::write(&path, original).unwrap();

        let mut config = VendorConfig::load_or_default(Some(path.clone()));
        assert_eq!(config.path(), Some(&path));

        config.tokens.clear();
        assert!(matches!(config.save(), Err(VendorError::ConfigSaveFailed(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }
}
