use anyhow::{Context, Result};
use clap::Subcommand;
use dialoguer::{Confirm, Input, Password, Select};

use crate::auth::AuthMode;
use crate::client::AdsClient;
use crate::config::{Profile, Settings};

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Interactive configuration wizard
    Setup {
        /// Run in non-interactive mode using environment variables
        #[arg(long)]
        non_interactive: bool,
    },

    /// Set configuration for a profile
    Set {
        /// Profile name
        #[arg(short, long, default_value = "default")]
        profile: String,

        /// OAuth token file, token directory, or service account key file
        #[arg(long, env = "GOOGLE_ADS_CREDENTIALS_PATH")]
        credentials_path: String,

        /// Google Ads developer token
        #[arg(long, env = "GOOGLE_ADS_DEVELOPER_TOKEN", hide_env_values = true)]
        developer_token: String,

        /// Manager account ID to send as login-customer-id
        #[arg(long, env = "GOOGLE_ADS_LOGIN_CUSTOMER_ID")]
        login_customer_id: Option<String>,

        /// Authentication type
        #[arg(long, value_enum, env = "GOOGLE_ADS_AUTH_TYPE", ignore_case = true)]
        auth_type: Option<AuthMode>,

        /// OAuth client ID
        #[arg(long, env = "GOOGLE_ADS_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret
        #[arg(long, env = "GOOGLE_ADS_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,

        /// User to impersonate with a service account
        #[arg(long, env = "GOOGLE_ADS_IMPERSONATION_EMAIL")]
        impersonation_email: Option<String>,
    },

    /// Show configuration for a profile
    Show {
        /// Profile name
        #[arg(short, long, default_value = "default")]
        profile: String,
    },

    /// List all configured profiles
    List,
}

impl ConfigCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            ConfigCommands::Setup { non_interactive } => {
                if *non_interactive {
                    self.setup_non_interactive()
                } else {
                    self.setup_interactive().await
                }
            }
            ConfigCommands::Set {
                profile,
                credentials_path,
                developer_token,
                login_customer_id,
                auth_type,
                client_id,
                client_secret,
                impersonation_email,
            } => {
                let entry = Profile {
                    credentials_path: Some(credentials_path.clone()),
                    developer_token: Some(developer_token.clone()),
                    login_customer_id: login_customer_id.clone(),
                    auth_type: auth_type.map(|m| m.as_str().to_string()),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    impersonation_email: impersonation_email.clone(),
                };
                self.save(profile, entry, false)
            }
            ConfigCommands::Show { profile } => self.show_config(profile),
            ConfigCommands::List => self.list_profiles(),
        }
    }

    async fn setup_interactive(&self) -> Result<()> {
        println!("Google Ads CLI Configuration Setup");
        println!("==================================\n");

        let profile: String = Input::new()
            .with_prompt("Profile name")
            .default("default".to_string())
            .interact_text()?;

        let modes = [AuthMode::Oauth, AuthMode::ServiceAccount];
        let selected = Select::new()
            .with_prompt("Authentication type")
            .items(&["OAuth (browser sign-in)", "Service account key file"])
            .default(0)
            .interact()?;
        let auth_mode = modes[selected];

        let credentials_prompt = match auth_mode {
            AuthMode::Oauth => "Token file or directory (client config or cached token)",
            AuthMode::ServiceAccount => "Service account key file",
        };
        let credentials_path: String = Input::new()
            .with_prompt(credentials_prompt)
            .interact_text()?;

        let developer_token: String = Password::new().with_prompt("Developer token").interact()?;

        let login_customer_id: String = Input::new()
            .with_prompt("Manager account ID (blank for none)")
            .allow_empty(true)
            .interact_text()?;

        let mut entry = Profile {
            credentials_path: Some(credentials_path),
            developer_token: Some(developer_token),
            login_customer_id: Some(login_customer_id).filter(|s| !s.trim().is_empty()),
            auth_type: Some(auth_mode.as_str().to_string()),
            ..Profile::default()
        };

        match auth_mode {
            AuthMode::Oauth => {
                let client_id: String = Input::new()
                    .with_prompt("OAuth client ID (blank to use a client config file)")
                    .allow_empty(true)
                    .interact_text()?;
                if !client_id.trim().is_empty() {
                    let client_secret: String =
                        Password::new().with_prompt("OAuth client secret").interact()?;
                    entry.client_id = Some(client_id);
                    entry.client_secret = Some(client_secret);
                }
            }
            AuthMode::ServiceAccount => {
                let subject: String = Input::new()
                    .with_prompt("User to impersonate (blank for none)")
                    .allow_empty(true)
                    .interact_text()?;
                entry.impersonation_email = Some(subject).filter(|s| !s.trim().is_empty());
            }
        }

        let test = Confirm::new()
            .with_prompt("Test connection now? (OAuth may open a browser)")
            .default(true)
            .interact()?;

        if test {
            println!("\nTesting connection...");
            let settings = Settings::resolve(&profile, entry.clone())?;
            let client = AdsClient::new(&settings)?;
            match client.list_accessible_customers().await {
                Ok(ids) => println!("Connection successful! {} accessible account(s).", ids.len()),
                Err(e) => {
                    eprintln!("Connection failed: {e}");
                    return Err(e.into());
                }
            }
        }

        self.save(&profile, entry, true)
    }

    fn setup_non_interactive(&self) -> Result<()> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let profile = var("GOOGLE_ADS_PROFILE").unwrap_or_else(|| "default".to_string());
        let entry = Profile {
            credentials_path: Some(
                var("GOOGLE_ADS_CREDENTIALS_PATH").context("GOOGLE_ADS_CREDENTIALS_PATH not set")?,
            ),
            developer_token: Some(
                var("GOOGLE_ADS_DEVELOPER_TOKEN").context("GOOGLE_ADS_DEVELOPER_TOKEN not set")?,
            ),
            login_customer_id: var("GOOGLE_ADS_LOGIN_CUSTOMER_ID"),
            auth_type: var("GOOGLE_ADS_AUTH_TYPE"),
            client_id: var("GOOGLE_ADS_CLIENT_ID"),
            client_secret: var("GOOGLE_ADS_CLIENT_SECRET"),
            impersonation_email: var("GOOGLE_ADS_IMPERSONATION_EMAIL"),
        };

        // Reject an unknown auth type before it reaches the file
        Settings::resolve(&profile, entry.clone())?;

        self.save(&profile, entry, false)
    }

    fn save(&self, profile: &str, entry: Profile, show_path: bool) -> Result<()> {
        Settings::set_profile(profile, entry)?;
        eprintln!("Configuration saved to profile '{profile}'");

        if show_path {
            if let Some(path) = Settings::config_path() {
                eprintln!("Config file: {path:?}");
            }
        }

        if profile != "default" {
            eprintln!("\nTo use this profile, either:");
            eprintln!("  gads accounts list --profile {profile}");
            eprintln!("  export GOOGLE_ADS_PROFILE={profile}");
        }

        Ok(())
    }

    fn show_config(&self, profile_name: &str) -> Result<()> {
        match Settings::get_profile(profile_name)? {
            Some(profile) => {
                println!("Profile: {profile_name}");
                println!("─────────────────────────────────");

                let show = |label: &str, value: &Option<String>, secret: bool| match value {
                    Some(v) if secret => println!("{label}: {}", Settings::mask_key(v)),
                    Some(v) => println!("{label}: {v}"),
                    None => println!("{label}: (not set)"),
                };

                show("Credentials Path", &profile.credentials_path, false);
                show("Developer Token", &profile.developer_token, true);
                show("Login Customer ID", &profile.login_customer_id, false);
                match &profile.auth_type {
                    Some(t) => println!("Auth Type: {t}"),
                    None => println!("Auth Type: (default: oauth)"),
                }
                show("Client ID", &profile.client_id, false);
                show("Client Secret", &profile.client_secret, true);
                show("Impersonation Email", &profile.impersonation_email, false);

                Ok(())
            }
            None => anyhow::bail!("Profile '{profile_name}' not found"),
        }
    }

    fn list_profiles(&self) -> Result<()> {
        let profiles = Settings::list_profiles()?;

        if profiles.is_empty() {
            println!("No profiles configured.");
            println!("Run 'gads config setup' to create a profile.");
        } else {
            println!("Configured profiles:");
            println!("─────────────────────");
            for profile in profiles {
                println!("  - {profile}");
            }
        }

        Ok(())
    }
}
