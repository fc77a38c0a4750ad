use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::token_client::{TokenClient, TokenResponse};
use super::{AuthError, DEFAULT_TOKEN_URI};

const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service account key file contents
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

/// Service account credential. Holds no access token: one is minted on
/// every use.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    scopes: Vec<String>,
    subject: Option<String>,
}

impl fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("client_email", &self.key.client_email)
            .field("token_uri", &self.key.token_uri)
            .field("scopes", &self.scopes)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Load a service account key file, delegating to `subject` when given.
pub fn load(
    path: &Path,
    scopes: &[&str],
    subject: Option<&str>,
) -> Result<ServiceAccountCredential, AuthError> {
    tracing::info!(path = %path.display(), "loading service account credentials");

    if !path.exists() {
        return Err(AuthError::CredentialFileNotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| AuthError::CredentialLoad(format!("failed to read {}: {e}", path.display())))?;
    let key: ServiceAccountKey = serde_json::from_str(&contents)
        .map_err(|e| AuthError::CredentialLoad(format!("invalid key file: {e}")))?;

    if let Some(key_type) = key.key_type.as_deref() {
        if key_type != "service_account" {
            return Err(AuthError::CredentialLoad(format!(
                "expected a service_account key file, found type '{key_type}'"
            )));
        }
    }

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| AuthError::CredentialLoad(format!("invalid private key: {e}")))?;

    let credential = ServiceAccountCredential::new(key, signing_key, scopes);
    match subject.filter(|s| !s.trim().is_empty()) {
        Some(subject) => {
            tracing::info!(subject, "impersonating user");
            credential.with_subject(subject)
        }
        None => Ok(credential),
    }
}

impl ServiceAccountCredential {
    pub(crate) fn new(key: ServiceAccountKey, signing_key: EncodingKey, scopes: &[&str]) -> Self {
        Self {
            key,
            signing_key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            subject: None,
        }
    }

    /// Delegate to a user in the service account's domain
    pub fn with_subject(mut self, subject: &str) -> Result<Self, AuthError> {
        let subject = subject.trim();
        let well_formed = subject
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && !domain.is_empty());
        if !well_formed {
            return Err(AuthError::CredentialLoad(format!(
                "cannot delegate to '{subject}': not an email address"
            )));
        }
        self.subject = Some(subject.to_string());
        Ok(self)
    }

    fn claims(&self, now: i64) -> Claims<'_> {
        Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
            sub: self.subject.as_deref(),
        }
    }

    fn assertion(&self, now: i64) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        jsonwebtoken::encode(&header, &self.claims(now), &self.signing_key)
            .map_err(|e| AuthError::CredentialLoad(format!("failed to sign assertion: {e}")))
    }

    /// Mint a fresh access token
    pub async fn mint(&self, tokens: &TokenClient) -> Result<TokenResponse, AuthError> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        tokens
            .jwt_bearer(&self.key.token_uri, &assertion)
            .await
            .map_err(|e| AuthError::TokenRefresh(e.to_string()))
    }
}
