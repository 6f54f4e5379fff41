//! # OAuth2 Token Endpoint
//!
//! Authorization-code and refresh-token grants against
//! `{base}/v1/oauth2/token`. Both are form posts; both return a
//! [`TokenGrant`] on 200 and a vendor error body otherwise.
//!
//! ```text
//! POST /v1/oauth2/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! code=..&client_id=..&client_secret=..&redirect_uri=..&grant_type=authorization_code
//! client_id=..&client_secret=..&refresh_token=..&grant_type=refresh_token
//! ```

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientCredentials;
use crate::error::{VendorError, VendorResult};
use crate::token::TokenGrant;

/// Consent page the user is sent to.
pub fn authorize_url(base: &str, client_id: &str, redirect_uri: &str) -> VendorResult<String> {
    let mut url = url::Url::parse(&format!("{}/v1/oauth2/authorize", base))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri);
    Ok(url.into())
}

pub fn token_url(base: &str) -> String {
    format!("{}/v1/oauth2/token", base)
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Serialize)]
struct CodeGrantForm<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

#[derive(Serialize)]
struct RefreshGrantForm<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'static str,
}

/// Error body the vendor returns on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct VendorErrorBody {
    #[serde(rename = "ErrorMessage", default)]
    pub message: String,
    #[serde(rename = "ErrorDetails", default)]
    pub details: String,
}

impl VendorErrorBody {
    /// Best-effort parse; falls back to the raw text.
    pub(crate) fn parse(text: &str) -> Self {
        serde_json::from_str::<VendorErrorBody>(text).unwrap_or_else(|_| VendorErrorBody {
            message: text.trim().to_string(),
            details: String::new(),
        })
    }
}

// =============================================================================
// Grants
// =============================================================================

/// Exchanges an authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    base: &str,
    client: &ClientCredentials,
    code: &str,
    redirect_uri: &str,
) -> VendorResult<TokenGrant> {
    let form = CodeGrantForm {
        code,
        client_id: &client.id,
        client_secret: &client.secret,
        redirect_uri,
        grant_type: "authorization_code",
    };
    debug!("Requesting access token");
    post_token_form(http, base, serde_urlencoded::to_string(&form)?).await
}

/// Trades a refresh token for a fresh pair.
pub async fn refresh(
    http: &reqwest::Client,
    base: &str,
    client: &ClientCredentials,
    refresh_token: &str,
) -> VendorResult<TokenGrant> {
    let form = RefreshGrantForm {
        client_id: &client.id,
        client_secret: &client.secret,
        refresh_token,
        grant_type: "refresh_token",
    };
    debug!("Refreshing access token");
    post_token_form(http, base, serde_urlencoded::to_string(&form)?).await
}

async fn post_token_form(http: &reqwest::Client, base: &str, body: String) -> VendorResult<TokenGrant> {
    let response = http
        .post(token_url(base))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::ACCEPT, "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let body = VendorErrorBody::parse(&text);
        warn!(status = status.as_u16(), message = %body.message, "Token request rejected");
        return Err(VendorError::TokenRejected {
            status: status.as_u16(),
            message: body.message,
            details: body.details,
        });
    }

    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let url = authorize_url("https://api.digikey.com", "my id", "https://127.0.0.1:4443").unwrap();
        assert_eq!(
            url,
            "https://api.digikey.com/v1/oauth2/authorize?response_type=code&client_id=my+id&redirect_uri=https%3A%2F%2F127.0.0.1%3A4443"
        );
    }

    #[test]
    fn test_code_form_field_order() {
        let form = CodeGrantForm {
            code: "abc",
            client_id: "id",
            client_secret: "s&s",
            redirect_uri: "https://127.0.0.1:4443",
            grant_type: "authorization_code",
        };
        assert_eq!(
            serde_urlencoded::to_string(&form).unwrap(),
            "code=abc&client_id=id&client_secret=s%26s&redirect_uri=https%3A%2F%2F127.0.0.1%3A4443&grant_type=authorization_code"
        );
    }

    #[test]
    fn test_error_body_parse() {
        let body = VendorErrorBody::parse(r#"{"ErrorMessage":"Bad code","ErrorDetails":"expired"}"#);
        assert_eq!(body.message, "Bad code");
        assert_eq!(body.details, "expired");

        let body = VendorErrorBody::parse("gateway exploded");
        assert_eq!(body.message, "gateway exploded");
        assert!(body.details.is_empty());
    }
}
