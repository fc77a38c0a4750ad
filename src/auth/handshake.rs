use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::oauth::UserCredential;
use super::token_client::TokenClient;
use super::token_store::ClientConfig;
use super::AuthError;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs an interactive authorization and returns the issued credential.
#[async_trait]
pub trait AuthorizationHandshake: Send + Sync {
    async fn run(&self, client: &ClientConfig, scopes: &[&str])
        -> Result<UserCredential, AuthError>;
}

/// Installed-app flow: opens the consent page in a browser and receives the
/// redirect on a loopback port.
pub struct LoopbackHandshake {
    tokens: TokenClient,
}

impl LoopbackHandshake {
    pub fn new(tokens: TokenClient) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl AuthorizationHandshake for LoopbackHandshake {
    async fn run(
        &self,
        client: &ClientConfig,
        scopes: &[&str],
    ) -> Result<UserCredential, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::Handshake(format!("failed to bind callback listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Handshake(format!("failed to read callback address: {e}")))?
            .port();
        let redirect_uri = format!("http://localhost:{port}/");
        let state = generate_state()?;

        let url = authorization_url(client, scopes, &redirect_uri, &state);
        eprintln!("Please visit this URL to authorize this application:\n{url}");
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "failed to open browser automatically");
        }

        let callback = wait_for_callback(listener).await?;
        if let Some(error) = callback.error {
            return Err(AuthError::Handshake(error));
        }
        if callback.state.as_deref() != Some(state.as_str()) {
            return Err(AuthError::Handshake("state mismatch in callback".to_string()));
        }
        let code = callback
            .code
            .ok_or_else(|| AuthError::Handshake("no authorization code received".to_string()))?;

        let response = self
            .tokens
            .exchange_code(
                &client.token_uri,
                &client.client_id,
                &client.client_secret,
                &code,
                &redirect_uri,
            )
            .await
            .map_err(|e| AuthError::Handshake(e.to_string()))?;

        Ok(UserCredential::issued(client, scopes, response))
    }
}

fn generate_state() -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|e| AuthError::Handshake(format!("failed to generate random state: {e}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Consent page URL requesting offline access, so a refresh token is issued.
pub(crate) fn authorization_url(
    client: &ClientConfig,
    scopes: &[&str],
    redirect_uri: &str,
    state: &str,
) -> String {
    let scope = scopes.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", client.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("state", state),
        ("access_type", "offline"),
        ("prompt", "consent"),
    ];
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{query}", client.auth_uri)
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub(crate) fn parse_callback_query(query: &str) -> CallbackParams {
    let mut params = CallbackParams::default();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let decoded = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => params.code = Some(decoded),
            "state" => params.state = Some(decoded),
            "error" => params.error = Some(decoded),
            _ => {}
        }
    }
    params
}

async fn wait_for_callback(listener: TcpListener) -> Result<CallbackParams, AuthError> {
    let (mut stream, _) = tokio::time::timeout(CALLBACK_TIMEOUT, listener.accept())
        .await
        .map_err(|_| AuthError::Handshake("timed out waiting for the OAuth redirect".to_string()))?
        .map_err(|e| AuthError::Handshake(format!("failed to accept callback: {e}")))?;

    let mut buffer = vec![0u8; 16 * 1024];
    let bytes_read = stream
        .read(&mut buffer)
        .await
        .map_err(|e| AuthError::Handshake(format!("failed reading callback: {e}")))?;
    let request = String::from_utf8_lossy(&buffer[..bytes_read]);

    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("");
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
    let params = parse_callback_query(query);

    let body = if params.error.is_some() {
        "<html><body><h1>Authorization Failed</h1><p>You can close this window.</p></body></html>"
    } else {
        "<html><body><h1>Authorization Successful</h1><p>You can close this window.</p></body></html>"
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!(error = %e, "failed writing callback response");
    }

    Ok(params)
}
