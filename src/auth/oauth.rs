use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::handshake::AuthorizationHandshake;
use super::token_client::{TokenClient, TokenResponse};
use super::token_store::{resolve_token_path, ClientConfig, TokenArtifact, TokenStore};
use super::{AuthError, DEFAULT_TOKEN_URI, SCOPES};
use crate::config::Settings;

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_SKEW_SECS: i64 = 300;

/// Interactive user credential in authorized-user JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCredential {
    #[serde(default)]
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl UserCredential {
    /// Build a credential from a fresh token endpoint response
    pub fn issued(client: &ClientConfig, scopes: &[&str], response: TokenResponse) -> Self {
        let expiry = response.expiry_from(Utc::now());
        Self {
            token: Some(response.access_token),
            refresh_token: response.refresh_token,
            token_uri: client.token_uri.clone(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expiry,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| now >= expiry - Duration::seconds(EXPIRY_SKEW_SECS))
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && !self.is_expired(now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Apply a refresh response. The refresh token is kept unless a new one
    /// was issued.
    pub fn apply(&mut self, response: TokenResponse) {
        self.expiry = response.expiry_from(Utc::now());
        self.token = Some(response.access_token);
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
    }

    /// Refresh against the credential's token endpoint
    pub async fn refresh(&mut self, tokens: &TokenClient) -> Result<(), super::TokenEndpointError> {
        let refresh_token = self.refresh_token.clone().unwrap_or_default();
        let response = tokens
            .refresh(
                &self.token_uri,
                &self.client_id,
                &self.client_secret,
                &refresh_token,
            )
            .await?;
        self.apply(response);
        Ok(())
    }
}

/// Obtains interactive user credentials, reusing the token file when possible.
pub struct OAuthProvider<'a> {
    settings: &'a Settings,
    tokens: &'a TokenClient,
    handshake: &'a dyn AuthorizationHandshake,
}

impl<'a> OAuthProvider<'a> {
    pub fn new(
        settings: &'a Settings,
        tokens: &'a TokenClient,
        handshake: &'a dyn AuthorizationHandshake,
    ) -> Self {
        Self {
            settings,
            tokens,
            handshake,
        }
    }

    pub async fn credential(&self, configured_path: &Path) -> Result<UserCredential, AuthError> {
        let store = TokenStore::new(resolve_token_path(configured_path));

        let mut client_config = None;
        let mut cached = None;
        match store.load() {
            Some(TokenArtifact::ClientConfig(config)) => {
                tracing::info!("found OAuth client configuration");
                client_config = Some(config);
            }
            Some(TokenArtifact::Authorized(credential)) => {
                tracing::info!("found existing OAuth token");
                cached = Some(credential);
            }
            None => {}
        }

        if let Some(credential) = &cached {
            if credential.is_valid(Utc::now()) {
                tracing::debug!("cached OAuth token is still valid");
                return Ok(credential.clone());
            }
        }

        let refreshed = match cached {
            Some(credential) if credential.can_refresh() => self.refresh(credential).await?,
            _ => None,
        };

        let credential = match refreshed {
            Some(credential) => credential,
            None => {
                let client_config = match client_config {
                    Some(config) => config,
                    None => self.client_config_from_settings()?,
                };
                tracing::info!("starting OAuth authentication flow");
                let credential = self.handshake.run(&client_config, SCOPES).await?;
                tracing::info!("OAuth flow completed successfully");
                credential
            }
        };

        tracing::info!(path = %store.path().display(), "saving credentials");
        if let Err(e) = store.save(&credential) {
            tracing::warn!(error = %e, "could not save credentials");
        }

        Ok(credential)
    }

    /// Refresh an expired credential. `Ok(None)` means the refresh token was
    /// rejected and a new authorization is needed.
    async fn refresh(
        &self,
        mut credential: UserCredential,
    ) -> Result<Option<UserCredential>, AuthError> {
        tracing::info!("refreshing expired token");
        match credential.refresh(self.tokens).await {
            Ok(()) => {
                tracing::info!("token successfully refreshed");
                Ok(Some(credential))
            }
            Err(e) if e.is_rejected() => {
                tracing::warn!(error = %e, "refresh token rejected, will request a new token");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "unexpected error refreshing token");
                Err(AuthError::CredentialRefresh(e.to_string()))
            }
        }
    }

    fn client_config_from_settings(&self) -> Result<ClientConfig, AuthError> {
        tracing::info!("creating OAuth client config from settings");
        let client_id = self.settings.client_id.as_deref().filter(|s| !s.is_empty());
        let client_secret = self
            .settings
            .client_secret
            .as_deref()
            .filter(|s| !s.is_empty());

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Ok(ClientConfig::installed(id, secret)),
            _ => Err(AuthError::Configuration(
                "GOOGLE_ADS_CLIENT_ID and GOOGLE_ADS_CLIENT_SECRET must be set if no client config file exists"
                    .to_string(),
            )),
        }
    }
}
