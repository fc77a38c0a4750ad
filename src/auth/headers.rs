use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::token_client::TokenClient;
use super::{AuthError, Credential};
use crate::config::Settings;
use crate::customer_id;

pub const DEVELOPER_TOKEN_HEADER: &str = "developer-token";
pub const LOGIN_CUSTOMER_ID_HEADER: &str = "login-customer-id";

/// Derives the per-request Google Ads headers from a credential.
pub struct HeaderBuilder<'a> {
    settings: &'a Settings,
    tokens: TokenClient,
}

impl<'a> HeaderBuilder<'a> {
    pub fn new(settings: &'a Settings, tokens: TokenClient) -> Self {
        Self { settings, tokens }
    }

    /// Build headers, refreshing an expired user token into `credential` so
    /// later requests reuse it.
    pub async fn build_headers_cached(
        &self,
        credential: &mut Credential,
    ) -> Result<HeaderMap, AuthError> {
        self.developer_token()?;

        if let Credential::User(user) = &mut *credential {
            if !user.is_valid(Utc::now()) && user.can_refresh() {
                tracing::info!("refreshing expired OAuth token before request");
                user.refresh(&self.tokens).await.map_err(|e| {
                    tracing::error!(error = %e, "error refreshing token");
                    AuthError::TokenRefresh(e.to_string())
                })?;
            }
        }

        self.build_headers(credential).await
    }

    pub async fn build_headers(&self, credential: &Credential) -> Result<HeaderMap, AuthError> {
        let developer_token = self.developer_token()?;

        let access_token = self.access_token(credential).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|_| {
                AuthError::TokenRefresh("access token is not a valid header value".to_string())
            })?,
        );
        headers.insert(
            HeaderName::from_static(DEVELOPER_TOKEN_HEADER),
            HeaderValue::from_str(developer_token).map_err(|_| {
                AuthError::Configuration("developer token is not a valid header value".to_string())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(login) = self
            .settings
            .login_customer_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        {
            let login = customer_id::normalize(login);
            headers.insert(
                HeaderName::from_static(LOGIN_CUSTOMER_ID_HEADER),
                HeaderValue::from_str(login.as_str())
                    .map_err(|e| AuthError::Configuration(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    fn developer_token(&self) -> Result<&'a str, AuthError> {
        self.settings
            .developer_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::Configuration("GOOGLE_ADS_DEVELOPER_TOKEN is not set".to_string())
            })
    }

    async fn access_token(&self, credential: &Credential) -> Result<String, AuthError> {
        match credential {
            Credential::Service(service) => Ok(service.mint(&self.tokens).await?.access_token),
            Credential::User(user) => {
                if user.is_valid(Utc::now()) {
                    return user
                        .token
                        .clone()
                        .ok_or_else(|| AuthError::TokenRefresh("missing access token".to_string()));
                }
                if !user.can_refresh() {
                    return Err(AuthError::TokenRefresh(
                        "token expired and no refresh token is available".to_string(),
                    ));
                }

                tracing::info!("refreshing expired OAuth token before request");
                let mut refreshed = user.clone();
                refreshed.refresh(&self.tokens).await.map_err(|e| {
                    tracing::error!(error = %e, "error refreshing token");
                    AuthError::TokenRefresh(e.to_string())
                })?;
                refreshed
                    .token
                    .ok_or_else(|| AuthError::TokenRefresh("missing access token".to_string()))
            }
        }
    }
}
