//! In-process stand-in for the vendor's token and barcode endpoints.
//!
//! Compiled for this crate's tests and, through the `testing` feature, for
//! the tests of crates that drive a [`VendorClient`](crate::VendorClient).
//!
//! The token endpoint accepts client id [`TEST_CLIENT_ID`], the code `abc`
//! and the refresh token `good-refresh`. Lookups accept the access tokens
//! those grants hand out ([`CODE_ACCESS_TOKEN`], `fresh-access`).

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TEST_CLIENT_ID: &str = "test-client";

/// Access token returned for the `abc` authorization code.
pub const CODE_ACCESS_TOKEN: &str = "code-access";

#[derive(Default)]
pub struct FakeVendor {
    token_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    last_payload: Mutex<Option<String>>,
}

impl FakeVendor {
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<String> {
        self.last_payload.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Starts the fake vendor on an ephemeral port and returns its base URL.
pub async fn spawn_fake_vendor() -> std::io::Result<(String, Arc<FakeVendor>)> {
    let vendor = Arc::new(FakeVendor::default());

    let app = Router::new()
        .route("/v1/oauth2/token", post(token_handler))
        .route("/Barcoding/v3/Product2DBarcodes/{payload}", get(lookup_handler))
        .with_state(vendor.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok((format!("http://{}", addr), vendor))
}

fn grant(access: &str, refresh: &str) -> Response {
    Json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 1800,
        "refresh_token_expires_in": 7_776_000,
        "token_type": "Bearer"
    }))
    .into_response()
}

fn vendor_error(status: StatusCode, message: &str, details: &str) -> Response {
    (
        status,
        Json(json!({ "ErrorMessage": message, "ErrorDetails": details })),
    )
        .into_response()
}

async fn token_handler(
    State(vendor): State<Arc<FakeVendor>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    vendor.token_calls.fetch_add(1, Ordering::SeqCst);

    if form.get("client_id").map(String::as_str) != Some(TEST_CLIENT_ID) {
        return vendor_error(StatusCode::UNAUTHORIZED, "Invalid client", "unknown client_id");
    }

    match (
        form.get("grant_type").map(String::as_str),
        form.get("code").map(String::as_str),
        form.get("refresh_token").map(String::as_str),
    ) {
        (Some("authorization_code"), Some("abc"), _) if form.contains_key("redirect_uri") => {
            grant(CODE_ACCESS_TOKEN, "code-refresh")
        }
        (Some("refresh_token"), _, Some("good-refresh")) => grant("fresh-access", "fresh-refresh"),
        _ => vendor_error(
            StatusCode::UNAUTHORIZED,
            "Invalid grant",
            "The code or refresh token is invalid or expired",
        ),
    }
}

async fn lookup_handler(
    State(vendor): State<Arc<FakeVendor>>,
    Path(payload): Path<String>,
    headers: HeaderMap,
) -> Response {
    vendor.lookup_calls.fetch_add(1, Ordering::SeqCst);

    let bearer_ok = matches!(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        Some("Bearer fresh-access") | Some("Bearer code-access")
    );
    if !bearer_ok {
        return vendor_error(StatusCode::UNAUTHORIZED, "Bearer token invalid", "");
    }
    if headers.get("x-digikey-client-id").and_then(|v| v.to_str().ok()) != Some(TEST_CLIENT_ID) {
        return vendor_error(StatusCode::UNAUTHORIZED, "Client id missing", "");
    }

    *vendor.last_payload.lock().unwrap_or_else(|e| e.into_inner()) = Some(payload);

    Json(json!({
        "DigiKeyPartNumber": "123-ND",
        "ManufacturerPartNumber": "RC0603FR-0710KL",
        "ManufacturerName": "YAGEO",
        "ProductDescription": "RES SMD 10K OHM 1% 1/10W 0603",
        "Quantity": 10,
        "SalesorderId": 73012345
    }))
    .into_response()
}
