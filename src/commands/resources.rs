use anyhow::Result;
use clap::Subcommand;

use crate::client::AdsClient;
use crate::commands::{output_result, CommonArgs};
use crate::formatters::format_results;
use crate::types::OutputFormat;

/// Resources usable in a GAQL FROM clause
pub const RESOURCES_QUERY: &str = "SELECT google_ads_field.name, google_ads_field.category, \
     google_ads_field.data_type \
     FROM google_ads_field \
     WHERE google_ads_field.category = 'RESOURCE' \
     ORDER BY google_ads_field.name";

#[derive(Debug, Subcommand)]
pub enum ResourcesCommands {
    /// List resources that can appear in a GAQL FROM clause
    List {
        /// Customer ID (dashes allowed)
        customer_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        #[command(flatten)]
        common: CommonArgs,
    },
}

impl ResourcesCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            ResourcesCommands::List {
                customer_id,
                format,
                common,
            } => {
                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let response = client.execute(customer_id, RESOURCES_QUERY).await?;

                let formatted = format_results(&response, *format)?;
                output_result(&formatted, common.output.as_deref())
            }
        }
    }
}
