pub mod accounts;
pub mod ads;
pub mod assets;
pub mod campaigns;
pub mod config;
pub mod keywords;
pub mod query;
pub mod resources;

use anyhow::Result;
use clap::Args;
use std::fs;

use crate::config::{Profile, Settings};
use crate::formatters::format_output;
use crate::types::OutputFormat;

/// Connection options shared by every API command
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Profile name
    #[arg(long, env = "GOOGLE_ADS_PROFILE")]
    pub profile: Option<String>,

    /// OAuth token file, token directory, or service account key file
    #[arg(long, env = "GOOGLE_ADS_CREDENTIALS_PATH")]
    pub credentials_path: Option<String>,

    /// Google Ads developer token
    #[arg(long, env = "GOOGLE_ADS_DEVELOPER_TOKEN", hide_env_values = true)]
    pub developer_token: Option<String>,

    /// Manager account ID to send as login-customer-id
    #[arg(long, env = "GOOGLE_ADS_LOGIN_CUSTOMER_ID")]
    pub login_customer_id: Option<String>,

    /// Authentication type: oauth or service_account
    #[arg(long, env = "GOOGLE_ADS_AUTH_TYPE")]
    pub auth_type: Option<String>,

    /// OAuth client ID, used when no client config file exists
    #[arg(long, env = "GOOGLE_ADS_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "GOOGLE_ADS_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// User to impersonate with a service account
    #[arg(long, env = "GOOGLE_ADS_IMPERSONATION_EMAIL")]
    pub impersonation_email: Option<String>,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<String>,
}

impl CommonArgs {
    fn overrides(&self) -> Profile {
        Profile {
            credentials_path: self.credentials_path.clone(),
            developer_token: self.developer_token.clone(),
            login_customer_id: self.login_customer_id.clone(),
            auth_type: self.auth_type.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            impersonation_email: self.impersonation_email.clone(),
        }
    }

    /// Build settings: CLI flags and their env vars, then the profile file
    pub fn settings(&self) -> Result<Settings> {
        let settings = Settings::load(self.profile.as_deref(), self.overrides())?;

        tracing::debug!(
            profile = %settings.profile,
            auth_mode = settings.auth_mode.as_str(),
            "settings loaded"
        );
        if settings.credentials_path.is_none() {
            anyhow::bail!(
                "Missing credentials path for profile '{}'. Run 'gads config setup' or set GOOGLE_ADS_CREDENTIALS_PATH.",
                settings.profile
            );
        }

        Ok(settings)
    }
}

/// Output result to stdout or file
pub fn output_result(content: &str, output_path: Option<&str>) -> Result<()> {
    if let Some(path) = output_path {
        fs::write(path, content)?;
        tracing::debug!(path, "output written");
    } else {
        println!("{}", content);
    }
    Ok(())
}

/// Format and output data
pub fn format_and_output<T: serde::Serialize>(
    data: &T,
    format: OutputFormat,
    output_path: Option<&str>,
) -> Result<()> {
    let formatted = format_output(data, format)?;
    output_result(&formatted, output_path)
}

/// Truncate to `max` characters
pub(crate) fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
