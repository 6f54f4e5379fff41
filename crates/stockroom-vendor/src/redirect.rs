//! # OAuth2 Redirect Listener
//!
//! A one-shot local HTTPS server the vendor's consent page redirects back
//! to. It lives for exactly one authorization attempt.
//!
//! ## Flow
//! ```text
//! ┌──────────┐   GET /?code=..     ┌──────────────────┐  Callback::Code   ┌──────────────┐
//! │ Browser  │ ──────────────────► │ RedirectListener │ ────────────────► │ VendorClient │
//! │          │                     │ (axum, :4443)    │                   │ exchange     │
//! │          │ ◄── success page ── │  awaits reply    │ ◄── PageOutcome ─ │ code         │
//! └──────────┘                     └──────────────────┘                   └──────────────┘
//!
//!   GET /?error=..   → Callback::Denied, failure page with a retry link
//!   GET /favicon.ico → 404, keep waiting
//! ```

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RedirectSettings;
use crate::error::{VendorError, VendorResult};

/// Grace period for the final page to reach the browser on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// =============================================================================
// Callback Types
// =============================================================================

/// What the browser brought back.
#[derive(Debug)]
pub enum Callback {
    /// Authorization code. The listener holds the browser's request open
    /// until `reply` says how the exchange went.
    Code {
        code: String,
        reply: oneshot::Sender<PageOutcome>,
    },
    /// The consent page redirected with `error=...`.
    Denied {
        error: String,
        description: Option<String>,
    },
}

/// Page to render for a code callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Success,
    Failed {
        status: u16,
        message: String,
        details: String,
    },
}

// =============================================================================
// Listener
// =============================================================================

struct ListenerState {
    callbacks: mpsc::Sender<Callback>,
    /// Consent URL linked from failure pages.
    retry_url: RwLock<String>,
}

pub struct RedirectListener {
    local_addr: SocketAddr,
    callbacks: mpsc::Receiver<Callback>,
    state: Arc<ListenerState>,
    handle: Handle,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RedirectListener {
    /// Binds and starts serving.
    ///
    /// With `tls` enabled the certificate and key PEM files from the
    /// settings are required.
    pub async fn bind(settings: &RedirectSettings) -> VendorResult<Self> {
        let addr: SocketAddr = format!("{}:{}", settings.bind_addr, settings.port)
            .parse()
            .map_err(|e| VendorError::InvalidConfig(format!("redirect bind address: {}", e)))?;

        let (tx, rx) = mpsc::channel(4);
        let state = Arc::new(ListenerState {
            callbacks: tx,
            retry_url: RwLock::new(String::new()),
        });

        let app = Router::new()
            .route("/", get(redirect_handler))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .with_state(state.clone());

        let handle = Handle::new();

        let task = if settings.tls {
            let tls = load_tls(settings).await?;
            let server = axum_server::bind_rustls(addr, tls).handle(handle.clone());
            tokio::spawn(async move { server.serve(app.into_make_service()).await })
        } else {
            let server = axum_server::bind(addr).handle(handle.clone());
            tokio::spawn(async move { server.serve(app.into_make_service()).await })
        };

        let local_addr = match handle.listening().await {
            Some(addr) => addr,
            None => {
                let reason = match task.await {
                    Ok(Err(e)) => e.to_string(),
                    Ok(Ok(())) => "server exited before listening".to_string(),
                    Err(e) => e.to_string(),
                };
                return Err(VendorError::Listener(format!("failed to bind {}: {}", addr, reason)));
            }
        };

        info!(addr = %local_addr, tls = settings.tls, "Redirect listener started");

        Ok(RedirectListener {
            local_addr,
            callbacks: rx,
            state,
            handle,
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Consent URL offered on failure pages.
    pub async fn set_retry_url(&self, url: impl Into<String>) {
        *self.state.retry_url.write().await = url.into();
    }

    /// Waits for the next code or error callback.
    pub async fn next_callback(&mut self, timeout: Duration) -> VendorResult<Callback> {
        match tokio::time::timeout(timeout, self.callbacks.recv()).await {
            Ok(Some(callback)) => Ok(callback),
            Ok(None) => Err(VendorError::Listener("redirect listener closed".into())),
            Err(_) => Err(VendorError::AuthorizationTimeout(timeout.as_secs())),
        }
    }

    /// Stops the server, letting in-flight responses finish.
    pub async fn shutdown(mut self) {
        self.handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Redirect listener exited with error"),
                Err(e) => warn!(error = %e, "Redirect listener task failed"),
            }
        }
        info!(addr = %self.local_addr, "Redirect listener stopped");
    }
}

impl Drop for RedirectListener {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.handle.shutdown();
        }
    }
}

async fn load_tls(settings: &RedirectSettings) -> VendorResult<RustlsConfig> {
    let (Some(cert), Some(key)) = (&settings.cert_path, &settings.key_path) else {
        return Err(VendorError::Tls(
            "redirect.cert_path and redirect.key_path must point to a PEM certificate and key".into(),
        ));
    };

    RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(|e| VendorError::Tls(format!("{}: {}", cert.display(), e)))
}

// =============================================================================
// Handler
// =============================================================================

async fn redirect_handler(
    State(state): State<Arc<ListenerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let retry_url = state.retry_url.read().await.clone();

    if let Some(error) = params.get("error") {
        let description = params.get("error_description").cloned();
        warn!(error = %error, "Authorization redirect carried an error");

        let page = failure_page(&[("Message", error.as_str())], &retry_url);
        let _ = state
            .callbacks
            .send(Callback::Denied {
                error: error.clone(),
                description,
            })
            .await;
        return Html(page).into_response();
    }

    let Some(code) = params.get("code") else {
        debug!("Ignoring redirect request without code or error");
        return StatusCode::NOT_FOUND.into_response();
    };

    info!("Authorization code received");
    let (reply_tx, reply_rx) = oneshot::channel();
    let callback = Callback::Code {
        code: code.clone(),
        reply: reply_tx,
    };

    if state.callbacks.send(callback).await.is_err() {
        error!("Redirect arrived after the listener stopped waiting");
        return (StatusCode::GONE, "Authorization is no longer pending").into_response();
    }

    match reply_rx.await {
        Ok(PageOutcome::Success) => Html(SUCCESS_PAGE.to_string()).into_response(),
        Ok(PageOutcome::Failed {
            status,
            message,
            details,
        }) => {
            let status = status.to_string();
            Html(failure_page(
                &[
                    ("Error code", status.as_str()),
                    ("Message", message.as_str()),
                    ("Details", details.as_str()),
                ],
                &retry_url,
            ))
            .into_response()
        }
        Err(_) => Html(failure_page(&[("Message", "authorization aborted")], &retry_url)).into_response(),
    }
}

// =============================================================================
// Pages
// =============================================================================

const SUCCESS_PAGE: &str = r#"<!doctype html>
<html><body style="text-align:center;font-family:sans-serif">
<p style="color:#008000"><strong>Success!</strong></p>
<p>You can close this window now.</p>
</body></html>"#;

fn failure_page(lines: &[(&str, &str)], retry_url: &str) -> String {
    let mut body = String::from(
        "<!doctype html>\n<html><body style=\"text-align:center;font-family:sans-serif\">\n\
         <p style=\"color:#ff6600\"><strong>Failed to authorise.</strong></p>\n",
    );
    for (label, value) in lines {
        body.push_str(&format!(
            "<p><strong>{}:</strong> {}</p>\n",
            label,
            escape_html(value)
        ));
    }
    if !retry_url.is_empty() {
        body.push_str(&format!(
            "<p>Click <a href=\"{}\">here</a> to try again.</p>\n",
            escape_html(retry_url)
        ));
    }
    body.push_str("</body></html>");
    body
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
