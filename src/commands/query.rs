use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;

use crate::client::AdsClient;
use crate::commands::{output_result, CommonArgs};
use crate::formatters::format_results;
use crate::types::OutputFormat;

#[derive(Debug, Subcommand)]
pub enum QueryCommands {
    /// Run a GAQL query and print the rows
    Run {
        /// Customer ID (dashes allowed)
        customer_id: String,

        /// GAQL query text. Use --file to read it from disk instead.
        #[arg(required_unless_present = "file")]
        query: Option<String>,

        /// Read the query from a file
        #[arg(long, conflicts_with = "query")]
        file: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        #[command(flatten)]
        common: CommonArgs,
    },
}

impl QueryCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            QueryCommands::Run {
                customer_id,
                query,
                file,
                format,
                common,
            } => {
                let query = match (query, file) {
                    (Some(query), _) => query.clone(),
                    (None, Some(path)) => fs::read_to_string(path)
                        .with_context(|| format!("Failed to read query file: {path}"))?,
                    (None, None) => anyhow::bail!("A query or --file is required"),
                };

                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let response = client.execute(customer_id, query.trim()).await?;
                tracing::debug!(rows = response.results.len(), "query complete");

                let formatted = format_results(&response, *format)?;
                output_result(&formatted, common.output.as_deref())
            }
        }
    }
}
