// ABOUTME: Credential lifecycle for the Google Ads API
// ABOUTME: Selects OAuth or service-account credentials and exposes one entry point

mod handshake;
mod headers;
mod oauth;
mod service_account;
mod token_client;
pub(crate) mod token_store;

pub use handshake::{AuthorizationHandshake, LoopbackHandshake};
pub use headers::HeaderBuilder;
pub use oauth::{OAuthProvider, UserCredential};
pub use service_account::ServiceAccountCredential;
pub use token_client::{TokenClient, TokenEndpointError};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::config::Settings;

/// OAuth scopes requested for every credential
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/adwords"];

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// How the process authenticates. Fixed once settings are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    #[value(name = "oauth")]
    Oauth,
    #[value(name = "service_account", alias = "service-account")]
    ServiceAccount,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Oauth => "oauth",
            AuthMode::ServiceAccount => "service_account",
        }
    }
}

impl FromStr for AuthMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oauth" => Ok(AuthMode::Oauth),
            "service_account" | "service-account" => Ok(AuthMode::ServiceAccount),
            other => Err(AuthError::Configuration(format!(
                "unknown auth type '{other}' (expected 'oauth' or 'service_account')"
            ))),
        }
    }
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Service account key file not found at {}", .0.display())]
    CredentialFileNotFound(PathBuf),

    #[error("Error loading service account credentials: {0}")]
    CredentialLoad(String),

    #[error("Error refreshing OAuth token: {0}")]
    CredentialRefresh(String),

    #[error("Failed to refresh OAuth token: {0}")]
    TokenRefresh(String),

    #[error("Invalid token file: {0}")]
    MalformedArtifact(String),

    #[error("OAuth authorization failed: {0}")]
    Handshake(String),
}

/// A credential ready to be turned into request headers.
#[derive(Debug, Clone)]
pub enum Credential {
    User(UserCredential),
    Service(ServiceAccountCredential),
}

impl Credential {
    pub fn mode(&self) -> AuthMode {
        match self {
            Credential::User(_) => AuthMode::Oauth,
            Credential::Service(_) => AuthMode::ServiceAccount,
        }
    }
}

/// Chooses the credential provider for the configured [`AuthMode`].
pub struct CredentialManager<'a> {
    settings: &'a Settings,
    tokens: TokenClient,
    handshake: Box<dyn AuthorizationHandshake>,
}

impl<'a> CredentialManager<'a> {
    pub fn new(
        settings: &'a Settings,
        tokens: TokenClient,
        handshake: Box<dyn AuthorizationHandshake>,
    ) -> Self {
        Self {
            settings,
            tokens,
            handshake,
        }
    }

    /// Return a credential usable for the current call.
    ///
    /// First and warm runs look the same to callers: cached tokens are reused,
    /// expired ones refreshed, and the interactive flow only runs when nothing
    /// recoverable is on disk.
    pub async fn get_credential(&self) -> Result<Credential, AuthError> {
        let path = self.settings.credentials_path.as_deref().ok_or_else(|| {
            AuthError::Configuration("GOOGLE_ADS_CREDENTIALS_PATH is not set".to_string())
        })?;

        tracing::info!(auth_mode = self.settings.auth_mode.as_str(), "resolving credentials");

        match self.settings.auth_mode {
            AuthMode::ServiceAccount => {
                let credential = service_account::load(
                    path,
                    SCOPES,
                    self.settings.impersonation_subject.as_deref(),
                )
                .inspect_err(|e| {
                    tracing::error!(error = %e, "service account authentication failed")
                })?;
                Ok(Credential::Service(credential))
            }
            AuthMode::Oauth => {
                let provider =
                    OAuthProvider::new(self.settings, &self.tokens, self.handshake.as_ref());
                Ok(Credential::User(provider.credential(path).await?))
            }
        }
    }
}
