use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Failures talking to an OAuth 2.0 token endpoint
#[derive(Error, Debug)]
pub enum TokenEndpointError {
    /// The endpoint refused the grant (expired or revoked refresh token, bad
    /// assertion, invalid code).
    #[error("token endpoint rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("token endpoint error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse token response: {0}")]
    Decode(String),
}

impl TokenEndpointError {
    pub fn is_rejected(&self) -> bool {
        matches!(self, TokenEndpointError::Rejected { .. })
    }
}

/// Successful token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| now + Duration::seconds(secs))
    }
}

/// Client for the OAuth token endpoint grants used by both auth modes.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: Client,
}

impl TokenClient {
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(
        &self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, TokenEndpointError> {
        tracing::debug!(token_uri, "refreshing access token");
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        self.request(token_uri, &form).await
    }

    /// Exchange a signed JWT assertion for an access token
    pub async fn jwt_bearer(
        &self,
        token_uri: &str,
        assertion: &str,
    ) -> Result<TokenResponse, TokenEndpointError> {
        tracing::debug!(token_uri, "minting service account access token");
        let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)];
        self.request(token_uri, &form).await
    }

    /// Exchange an authorization code from the interactive flow
    pub async fn exchange_code(
        &self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, TokenEndpointError> {
        tracing::debug!(token_uri, "exchanging authorization code");
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
        ];
        self.request(token_uri, &form).await
    }

    async fn request(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, TokenEndpointError> {
        let response = self
            .http
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| TokenEndpointError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<TokenResponse>()
                .await
                .map_err(|e| TokenEndpointError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(TokenEndpointError::Rejected {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(TokenEndpointError::Server {
                status: status.as_u16(),
                body,
            })
        }
    }
}
