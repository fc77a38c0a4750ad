use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::auth::AuthMode;

pub const DEFAULT_API_BASE: &str = "https://googleads.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v19";
const DEFAULT_PROFILE: &str = "default";

/// Profile configuration stored in config file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonation_email: Option<String>,
}

impl Profile {
    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: &Profile) -> Profile {
        Profile {
            credentials_path: self
                .credentials_path
                .or_else(|| fallback.credentials_path.clone()),
            developer_token: self
                .developer_token
                .or_else(|| fallback.developer_token.clone()),
            login_customer_id: self
                .login_customer_id
                .or_else(|| fallback.login_customer_id.clone()),
            auth_type: self.auth_type.or_else(|| fallback.auth_type.clone()),
            client_id: self.client_id.or_else(|| fallback.client_id.clone()),
            client_secret: self.client_secret.or_else(|| fallback.client_secret.clone()),
            impersonation_email: self
                .impersonation_email
                .or_else(|| fallback.impersonation_email.clone()),
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

/// Immutable runtime settings, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: String,
    pub credentials_path: Option<PathBuf>,
    pub developer_token: Option<String>,
    pub login_customer_id: Option<String>,
    pub auth_mode: AuthMode,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub impersonation_subject: Option<String>,
    pub api_base: String,
    pub api_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            credentials_path: None,
            developer_token: None,
            login_customer_id: None,
            auth_mode: AuthMode::default(),
            client_id: None,
            client_secret: None,
            impersonation_subject: None,
            api_base: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl Settings {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "gads") {
            let config_dir = proj_dirs.config_dir();
            Some(config_dir.join("config.yml"))
        } else {
            // Fallback to ~/.gads/config.yml
            dirs::home_dir().map(|home| home.join(".gads").join("config.yml"))
        }
    }

    /// Load configuration file
    pub fn load_config_file() -> Result<ConfigFile> {
        let path = Self::config_path();

        if let Some(path) = path {
            if path.exists() {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                let config: ConfigFile = serde_yaml::from_str(&contents)
                    .with_context(|| "Failed to parse config file")?;
                return Ok(config);
            }
        }

        Ok(ConfigFile::default())
    }

    /// Save configuration file
    pub fn save_config_file(config_file: &ConfigFile) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents =
            serde_yaml::to_string(config_file).with_context(|| "Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        // Developer tokens and client secrets live here
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Load settings with priority: CLI options (including their env vars) >
    /// config file profile > defaults
    pub fn load(profile: Option<&str>, overrides: Profile) -> Result<Self> {
        let profile_name = profile.unwrap_or(DEFAULT_PROFILE).to_string();

        let config_file = Self::load_config_file().unwrap_or_default();
        let file_profile = config_file
            .profiles
            .get(&profile_name)
            .cloned()
            .unwrap_or_default();

        Self::resolve(&profile_name, overrides.or(&file_profile))
    }

    /// Turn a merged profile into settings
    pub fn resolve(profile_name: &str, merged: Profile) -> Result<Self> {
        let auth_mode = match non_empty(merged.auth_type) {
            Some(raw) => raw.parse::<AuthMode>()?,
            None => AuthMode::default(),
        };

        Ok(Self {
            profile: profile_name.to_string(),
            credentials_path: non_empty(merged.credentials_path).map(PathBuf::from),
            developer_token: non_empty(merged.developer_token),
            login_customer_id: non_empty(merged.login_customer_id),
            auth_mode,
            client_id: non_empty(merged.client_id),
            client_secret: non_empty(merged.client_secret),
            impersonation_subject: non_empty(merged.impersonation_email),
            ..Self::default()
        })
    }

    /// Set a profile in the config file
    pub fn set_profile(profile_name: &str, profile: Profile) -> Result<()> {
        let mut config_file = Self::load_config_file().unwrap_or_default();
        config_file
            .profiles
            .insert(profile_name.to_string(), profile);
        Self::save_config_file(&config_file)
    }

    /// Get a profile from the config file
    pub fn get_profile(profile_name: &str) -> Result<Option<Profile>> {
        let config_file = Self::load_config_file()?;
        Ok(config_file.profiles.get(profile_name).cloned())
    }

    /// List all profiles
    pub fn list_profiles() -> Result<Vec<String>> {
        let config_file = Self::load_config_file()?;
        Ok(config_file.profiles.keys().cloned().collect())
    }

    /// Base URL for customer-scoped endpoints
    pub fn customers_url(&self) -> String {
        format!(
            "{}/{}/customers",
            self.api_base.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Mask a secret for display (show first 8 chars + asterisks)
    pub fn mask_key(key: &str) -> String {
        if key.chars().count() <= 8 {
            "*".repeat(key.chars().count())
        } else {
            let prefix: String = key.chars().take(8).collect();
            format!("{prefix}********")
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve("default", Profile::default()).unwrap();
        assert_eq!(settings.auth_mode, AuthMode::Oauth);
        assert!(settings.credentials_path.is_none());
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_overrides_win_over_file_profile() {
        let overrides = Profile {
            developer_token: Some("cli-token".to_string()),
            ..Profile::default()
        };
        let file = Profile {
            developer_token: Some("file-token".to_string()),
            credentials_path: Some("/etc/gads/token.json".to_string()),
            auth_type: Some("service_account".to_string()),
            ..Profile::default()
        };

        let settings = Settings::resolve("work", overrides.or(&file)).unwrap();

        assert_eq!(settings.profile, "work");
        assert_eq!(settings.developer_token.as_deref(), Some("cli-token"));
        assert_eq!(
            settings.credentials_path,
            Some(PathBuf::from("/etc/gads/token.json"))
        );
        assert_eq!(settings.auth_mode, AuthMode::ServiceAccount);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = Settings::resolve(
            "default",
            Profile {
                login_customer_id: Some("   ".to_string()),
                auth_type: Some("".to_string()),
                ..Profile::default()
            },
        )
        .unwrap();
        assert!(settings.login_customer_id.is_none());
        assert_eq!(settings.auth_mode, AuthMode::Oauth);
    }

    #[test]
    fn test_unknown_auth_type_is_rejected() {
        let result = Settings::resolve(
            "default",
            Profile {
                auth_type: Some("apikey".to_string()),
                ..Profile::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_customers_url() {
        let settings = Settings {
            api_base: "http://127.0.0.1:9999/".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.customers_url(), "http://127.0.0.1:9999/v19/customers");
    }

    #[test]
    fn test_profile_yaml_round_trip_skips_unset() {
        let mut file = ConfigFile::default();
        file.profiles.insert(
            "default".to_string(),
            Profile {
                developer_token: Some("abc".to_string()),
                ..Profile::default()
            },
        );
        let yaml = serde_yaml::to_string(&file).unwrap();
        assert!(yaml.contains("developer_token: abc"));
        assert!(!yaml.contains("client_secret"));

        let parsed: ConfigFile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.profiles["default"], file.profiles["default"]);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(Settings::mask_key("short"), "*****");
        assert_eq!(Settings::mask_key("ABCDEFGHIJKL"), "ABCDEFGH********");
    }
}
