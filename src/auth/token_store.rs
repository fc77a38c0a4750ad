use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::oauth::UserCredential;
use super::{AuthError, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI};

pub const DEFAULT_TOKEN_FILE: &str = "google_ads_token.json";

/// OAuth application identity (the "installed" or "web" client secrets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientConfig {
    /// Installed-app client config built from a bare client id and secret
    pub fn installed(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: vec![
                "urn:ietf:wg:oauth:2.0:oob".to_string(),
                "http://localhost".to_string(),
            ],
        }
    }
}

/// Contents of the token file: either client identity or an issued token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenArtifact {
    ClientConfig(ClientConfig),
    Authorized(UserCredential),
}

impl TokenArtifact {
    /// Decode a token file by inspecting its keys. `installed` and `web` are
    /// checked before the contents are treated as an issued token.
    pub fn parse(contents: &str) -> Result<Self, AuthError> {
        let value: Value = serde_json::from_str(contents)
            .map_err(|e| AuthError::MalformedArtifact(format!("invalid JSON: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| AuthError::MalformedArtifact("expected a JSON object".to_string()))?;

        for key in ["installed", "web"] {
            if let Some(section) = object.get(key) {
                return serde_json::from_value(section.clone())
                    .map(TokenArtifact::ClientConfig)
                    .map_err(|e| {
                        AuthError::MalformedArtifact(format!("invalid '{key}' client config: {e}"))
                    });
            }
        }

        serde_json::from_value(value)
            .map(TokenArtifact::Authorized)
            .map_err(|e| AuthError::MalformedArtifact(format!("invalid authorized user info: {e}")))
    }
}

/// Where the OAuth token lives for a configured credentials path.
///
/// A path that is a directory, or that does not name a `.json` file, maps to
/// `google_ads_token.json` next to it.
pub fn resolve_token_path(configured: &Path) -> PathBuf {
    if configured.is_dir() {
        return configured.join(DEFAULT_TOKEN_FILE);
    }

    let is_json = configured
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        configured.to_path_buf()
    } else {
        configured
            .parent()
            .map(|dir| dir.join(DEFAULT_TOKEN_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE))
    }
}

/// Reads and writes the token artifact at a single path. Last write wins.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the artifact. Missing, unreadable or corrupt files are a cache miss.
    pub fn load(&self) -> Option<TokenArtifact> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no token file");
            return None;
        }

        tracing::info!(path = %self.path.display(), "loading OAuth credentials");

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read token file");
                return None;
            }
        };

        match TokenArtifact::parse(&contents) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring token file");
                None
            }
        }
    }

    /// Persist an issued credential, creating parent directories as needed
    pub fn save(&self, credential: &UserCredential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create token directory: {:?}", parent))?;
            }
        }

        let contents =
            serde_json::to_string_pretty(credential).context("Failed to serialize credentials")?;

        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write token file: {:?}", self.path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}
