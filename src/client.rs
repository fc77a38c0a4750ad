use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::{
    AuthError, AuthorizationHandshake, Credential, CredentialManager, HeaderBuilder,
    LoopbackHandshake, TokenClient,
};
use crate::config::Settings;
use crate::customer_id;
use crate::types::*;

/// API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx reply. Displays the response body as sent.
    #[error("{body}")]
    Status { status: u16, body: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Google Ads REST API client
pub struct AdsClient<'a> {
    client: Client,
    settings: &'a Settings,
    credentials: CredentialManager<'a>,
    headers: HeaderBuilder<'a>,
    credential: Mutex<Option<Credential>>,
}

impl<'a> AdsClient<'a> {
    /// Create a client that runs the browser flow when no usable token exists
    pub fn new(settings: &'a Settings) -> Result<Self, ApiError> {
        let client = build_http_client()?;
        let handshake = LoopbackHandshake::new(TokenClient::with_client(client.clone()));
        Ok(Self::with_parts(settings, client, Box::new(handshake)))
    }

    /// Create a client with a custom authorization handshake
    #[cfg(test)]
    pub fn with_handshake(
        settings: &'a Settings,
        handshake: Box<dyn AuthorizationHandshake>,
    ) -> Result<Self, ApiError> {
        let client = build_http_client()?;
        Ok(Self::with_parts(settings, client, handshake))
    }

    fn with_parts(
        settings: &'a Settings,
        client: Client,
        handshake: Box<dyn AuthorizationHandshake>,
    ) -> Self {
        let tokens = TokenClient::with_client(client.clone());
        Self {
            credentials: CredentialManager::new(settings, tokens.clone(), handshake),
            headers: HeaderBuilder::new(settings, tokens),
            client,
            settings,
            credential: Mutex::new(None),
        }
    }

    /// Credentials are resolved once per client. Access tokens are checked on
    /// every request and a refreshed token replaces the cached one.
    async fn request_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut cached = self.credential.lock().await;
        let credential = match cached.take() {
            Some(credential) => credential,
            None => {
                let credential = self.credentials.get_credential().await?;
                tracing::debug!(auth_mode = credential.mode().as_str(), "credential ready");
                credential
            }
        };
        let credential = cached.insert(credential);
        Ok(self.headers.build_headers_cached(credential).await?)
    }

    /// Make an authenticated GET request
    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let headers = self.request_headers().await?;
        tracing::debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request
    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
    ) -> Result<T, ApiError> {
        tracing::debug!(url, "POST");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(ApiError::from_transport)?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    // ========== Search API ==========

    /// Run a GAQL query, following `nextPageToken` until the result set is
    /// complete.
    pub async fn execute(
        &self,
        customer_id: impl std::fmt::Display,
        query: &str,
    ) -> Result<SearchResponse, ApiError> {
        let request = QueryRequest::new(customer_id, query);
        let headers = self.request_headers().await?;
        let url = format!(
            "{}/{}/googleAds:search",
            self.settings.customers_url(),
            request.customer_id
        );

        let mut response: SearchResponse = self
            .post(&url, headers.clone(), &request.body(None))
            .await?;

        let mut page_token = next_page(response.next_page_token.take(), None);
        while let Some(token) = page_token {
            tracing::debug!(customer_id = %request.customer_id, "fetching next result page");
            let mut page: SearchResponse = self
                .post(&url, headers.clone(), &request.body(Some(&token)))
                .await?;
            response.results.append(&mut page.results);
            page_token = next_page(page.next_page_token.take(), Some(&token));
        }

        Ok(response)
    }

    // ========== Customers API ==========

    /// List customer IDs directly accessible to the authenticated user
    pub async fn list_accessible_customers(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}:listAccessibleCustomers", self.settings.customers_url());
        let customers: AccessibleCustomers = self.get(&url).await?;
        Ok(customers.customer_ids())
    }

    // ========== Ad Group Criteria API ==========

    pub async fn mutate_ad_group_criteria(
        &self,
        customer_id: impl std::fmt::Display,
        operations: Vec<AdGroupCriterionOperation>,
    ) -> Result<MutateResponse, ApiError> {
        let customer_id = customer_id::normalize(customer_id);
        let headers = self.request_headers().await?;
        let url = format!(
            "{}/{}/adGroupCriteria:mutate",
            self.settings.customers_url(),
            customer_id
        );
        self.post(&url, headers, &MutateRequest { operations }).await
    }
}

/// An empty token, or one equal to the page just fetched, ends the result set.
fn next_page(token: Option<String>, previous: Option<&str>) -> Option<String> {
    token.filter(|t| !t.is_empty() && Some(t.as_str()) != previous)
}

fn build_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_store::ClientConfig;
    use crate::auth::UserCredential;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NoHandshake;

    #[async_trait]
    impl AuthorizationHandshake for NoHandshake {
        async fn run(
            &self,
            _client: &ClientConfig,
            _scopes: &[&str],
        ) -> Result<UserCredential, AuthError> {
            panic!("handshake must not run");
        }
    }

    /// Settings pointing at `server` with a valid cached user token on disk
    fn settings_for(server: &MockServer, dir: &tempfile::TempDir) -> Settings {
        let token_path = dir.path().join("google_ads_token.json");
        let credential = UserCredential {
            token: Some("access-1".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            token_uri: format!("{}/token", server.uri()),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec![],
            expiry: Some(Utc::now() + Duration::hours(1)),
        };
        std::fs::write(&token_path, serde_json::to_string(&credential).unwrap()).unwrap();

        Settings {
            credentials_path: Some(token_path),
            developer_token: Some("dev-token".to_string()),
            api_base: server.uri(),
            ..Settings::default()
        }
    }

    fn client(settings: &Settings) -> AdsClient<'_> {
        AdsClient::with_handshake(settings, Box::new(NoHandshake)).unwrap()
    }

    #[tokio::test]
    async fn test_execute_single_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19/customers/1234567890/googleAds:search"))
            .and(header("authorization", "Bearer access-1"))
            .and(header("developer-token", "dev-token"))
            .and(body_json(json!({"query": "SELECT campaign.id FROM campaign"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"campaign": {"id": "1"}}],
                "fieldMask": "campaign.id"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, &dir);

        let response = client(&settings)
            .execute("123-456-7890", "SELECT campaign.id FROM campaign")
            .await
            .unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.extra["fieldMask"], "campaign.id");
    }

    #[tokio::test]
    async fn test_execute_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"query": "Q"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"campaign": {"id": "1"}}],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!({"query": "Q", "pageToken": "page-2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"campaign": {"id": "2"}}, {"campaign": {"id": "3"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, &dir);

        let response = client(&settings).execute("1234567890", "Q").await.unwrap();

        let ids: Vec<&str> = response
            .results
            .iter()
            .map(|row| row["campaign"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert!(response.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_execute_stops_on_empty_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"campaign": {"id": "1"}}],
                "nextPageToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, &dir);

        let response = client(&settings).execute("1234567890", "Q").await.unwrap();
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_stops_on_repeated_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"query": "Q"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"campaign": {"id": "1"}}],
                "nextPageToken": "stuck"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!({"query": "Q", "pageToken": "stuck"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"campaign": {"id": "2"}}],
                "nextPageToken": "stuck"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, &dir);

        let response = client(&settings).execute("1234567890", "Q").await.unwrap();
        assert_eq!(response.results.len(), 2);
    }

    #[test]
    fn test_next_page() {
        assert_eq!(next_page(Some("b".to_string()), Some("a")).as_deref(), Some("b"));
        assert_eq!(next_page(Some("a".to_string()), Some("a")), None);
        assert_eq!(next_page(Some(String::new()), None), None);
        assert_eq!(next_page(None, None), None);
    }

    #[tokio::test]
    async fn test_error_status_displays_body_verbatim() {
        let server = MockServer::start().await;
        let body = r#"{"error": {"code": 400, "message": "Invalid GAQL"}}"#;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(body))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, &dir);

        let err = client(&settings)
            .execute("1234567890", "SELECT nonsense")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 400, .. }));
        assert_eq!(err.to_string(), body);
    }

    #[tokio::test]
    async fn test_auth_failure_makes_no_api_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let settings = Settings {
            api_base: server.uri(),
            developer_token: Some("dev-token".to_string()),
            ..Settings::default()
        };

        let err = client(&settings).execute("1", "Q").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_list_accessible_customers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v19/customers:listAccessibleCustomers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resourceNames": ["customers/1111111111", "customers/2222222222"]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, &dir);

        let ids = client(&settings).list_accessible_customers().await.unwrap();
        assert_eq!(ids, ["1111111111", "2222222222"]);
    }

    #[tokio::test]
    async fn test_mutate_ad_group_criteria() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19/customers/0000000042/adGroupCriteria:mutate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"resourceName": "customers/0000000042/adGroupCriteria/7~99"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(&server, &dir);
        let customer = customer_id::normalize(42);

        let response = client(&settings)
            .mutate_ad_group_criteria(
                &customer,
                vec![AdGroupCriterionOperation::create_keyword(
                    &customer,
                    "7",
                    "shoes",
                    MatchType::Exact,
                )],
            )
            .await
            .unwrap();

        assert_eq!(
            response.results[0].resource_name,
            "customers/0000000042/adGroupCriteria/7~99"
        );
    }
}
