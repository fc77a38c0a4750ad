use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod auth;
mod client;
mod commands;
mod config;
mod customer_id;
mod formatters;
mod types;

use commands::accounts::AccountsCommands;
use commands::ads::AdsCommands;
use commands::assets::AssetsCommands;
use commands::campaigns::CampaignsCommands;
use commands::config::ConfigCommands;
use commands::keywords::KeywordsCommands;
use commands::query::QueryCommands;
use commands::resources::ResourcesCommands;

/// gads - Command-line interface for the Google Ads API
#[derive(Parser)]
#[command(name = "gads")]
#[command(author = "gads Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line interface for Google Ads reporting and GAQL queries", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration profiles
    #[command(subcommand)]
    Config(ConfigCommands),

    /// List accounts and account details
    #[command(subcommand)]
    Accounts(AccountsCommands),

    /// Run GAQL queries
    #[command(subcommand)]
    Query(QueryCommands),

    /// Campaign reports
    #[command(subcommand)]
    Campaigns(CampaignsCommands),

    /// Ad reports
    #[command(subcommand)]
    Ads(AdsCommands),

    /// Asset reports
    #[command(subcommand)]
    Assets(AssetsCommands),

    /// Discover GAQL resources
    #[command(subcommand)]
    Resources(ResourcesCommands),

    /// Create keywords
    #[command(subcommand)]
    Keywords(KeywordsCommands),
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "gads=debug" } else { "gads=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Config(cmd) => cmd.execute().await,
        Commands::Accounts(cmd) => cmd.execute().await,
        Commands::Query(cmd) => cmd.execute().await,
        Commands::Campaigns(cmd) => cmd.execute().await,
        Commands::Ads(cmd) => cmd.execute().await,
        Commands::Assets(cmd) => cmd.execute().await,
        Commands::Resources(cmd) => cmd.execute().await,
        Commands::Keywords(cmd) => cmd.execute().await,
    }
}
