//! services/api/src/adapters/google_identity.rs
//!
//! Verifies Google ID tokens against Google's `tokeninfo` endpoint and implements the
//! `IdentityVerifier` port.

use async_trait::async_trait;
use serde::Deserialize;
use story_tutor_core::domain::GoogleIdentity;
use story_tutor_core::ports::{IdentityVerifier, PortError, PortResult};
use tracing::{error, warn};

const TOKEN_INFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Google encodes booleans in tokeninfo responses as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_true(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<Flag>,
    name: Option<String>,
}

pub struct GoogleTokenInfoAdapter {
    http: reqwest::Client,
    client_id: String,
}

impl GoogleTokenInfoAdapter {
    pub fn new(http: reqwest::Client, client_id: String) -> Self {
        Self { http, client_id }
    }

    fn to_identity(&self, info: TokenInfo) -> PortResult<GoogleIdentity> {
        if info.aud != self.client_id {
            warn!(aud = %info.aud, "Google token issued for another client");
            return Err(PortError::Unauthorized);
        }
        if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            warn!(iss = %info.iss, "Google token has an unexpected issuer");
            return Err(PortError::Unauthorized);
        }
        let email = info.email.ok_or(PortError::Unauthorized)?;
        Ok(GoogleIdentity {
            subject: info.sub,
            email,
            email_verified: info.email_verified.map_or(false, |f| f.is_true()),
            name: info.name,
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenInfoAdapter {
    async fn verify_google_token(&self, id_token: &str) -> PortResult<GoogleIdentity> {
        let response = self
            .http
            .get(TOKEN_INFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to reach Google tokeninfo");
                PortError::Unexpected(e.to_string())
            })?;

        // Google answers 400 for expired, malformed or tampered tokens.
        if response.status().is_client_error() {
            return Err(PortError::Unauthorized);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(PortError::Unexpected(format!(
                "Google tokeninfo returned {}",
                status
            )));
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Google tokeninfo response");
            PortError::Unexpected(e.to_string())
        })?;
        self.to_identity(info)
    }
}
