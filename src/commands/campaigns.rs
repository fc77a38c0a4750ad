use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::client::AdsClient;
use crate::commands::{format_and_output, output_result, truncate, CommonArgs};
use crate::formatters::numbers::{micros_to_units, money, percent, thousands};
use crate::types::{date_range, OutputFormat, SearchResponse};

const NAME_WIDTH: usize = 40;

#[derive(Debug, Subcommand)]
pub enum CampaignsCommands {
    /// Campaign metrics over a trailing window
    Performance {
        /// Customer ID (dashes allowed)
        customer_id: String,

        /// Days to look back: 7, 14 or 30
        #[arg(short, long, default_value = "30")]
        days: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, Serialize)]
pub struct CampaignRow {
    #[serde(rename = "Campaign")]
    pub campaign: String,
    #[serde(rename = "Impressions")]
    pub impressions: String,
    #[serde(rename = "Clicks")]
    pub clicks: String,
    #[serde(rename = "CTR")]
    pub ctr: String,
    #[serde(rename = "Avg CPC")]
    pub average_cpc: String,
    #[serde(rename = "Cost")]
    pub cost: String,
    #[serde(rename = "Conversions")]
    pub conversions: String,
    #[serde(rename = "Cost/Conv")]
    pub cost_per_conversion: String,
}

impl CampaignsCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            CampaignsCommands::Performance {
                customer_id,
                days,
                format,
                common,
            } => {
                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let response = client
                    .execute(customer_id, &performance_query(*days))
                    .await?;

                if response.is_empty() {
                    return output_result(
                        "No campaign performance data found for this customer ID and time period.",
                        common.output.as_deref(),
                    );
                }

                if matches!(format, OutputFormat::Table) {
                    eprintln!("Campaign Performance for Customer ID {customer_id} (Last {days} days):");
                }
                format_and_output(&campaign_rows(&response), *format, common.output.as_deref())
            }
        }
    }
}

pub fn performance_query(days: u32) -> String {
    format!(
        "SELECT campaign.name, metrics.impressions, metrics.clicks, metrics.ctr, \
         metrics.average_cpc, metrics.cost_micros, metrics.conversions, \
         metrics.cost_per_conversion \
         FROM campaign \
         WHERE segments.date DURING {} \
         ORDER BY metrics.impressions DESC",
        date_range(days)
    )
}

pub fn campaign_rows(response: &SearchResponse) -> Vec<CampaignRow> {
    response
        .rows()
        .into_iter()
        .map(|row| {
            let m = &row.metrics;
            CampaignRow {
                campaign: truncate(row.campaign.name.as_deref().unwrap_or("N/A"), NAME_WIDTH),
                impressions: thousands(m.impressions()),
                clicks: thousands(m.clicks()),
                ctr: percent(m.ctr()),
                average_cpc: money(micros_to_units(m.average_cpc())),
                cost: money(micros_to_units(m.cost_micros() as f64)),
                conversions: format!("{:.2}", m.conversions()),
                cost_per_conversion: money(micros_to_units(m.cost_per_conversion())),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_performance_query_date_range() {
        assert!(performance_query(7).contains("DURING LAST_7_DAYS"));
        assert!(performance_query(14).contains("DURING LAST_14_DAYS"));
        assert!(performance_query(90).contains("DURING LAST_30_DAYS"));
    }

    #[test]
    fn test_campaign_rows() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [{
                "campaign": {"name": "A campaign name that is much longer than forty characters"},
                "metrics": {
                    "impressions": "1234567",
                    "clicks": "8910",
                    "ctr": 0.0072,
                    "averageCpc": 1250000,
                    "costMicros": "11137500000",
                    "conversions": 42.5,
                    "costPerConversion": 262058823.5
                }
            }]
        }))
        .unwrap();

        let rows = campaign_rows(&response);
        let row = &rows[0];

        assert_eq!(row.campaign.chars().count(), 40);
        assert_eq!(row.impressions, "1,234,567");
        assert_eq!(row.clicks, "8,910");
        assert_eq!(row.ctr, "0.72%");
        assert_eq!(row.average_cpc, "1.25");
        assert_eq!(row.cost, "11,137.50");
        assert_eq!(row.conversions, "42.50");
        assert_eq!(row.cost_per_conversion, "262.06");
    }

    #[test]
    fn test_missing_metrics_render_as_zero() {
        let response: SearchResponse =
            serde_json::from_value(json!({"results": [{"campaign": {"name": "Quiet"}}]})).unwrap();

        let rows = campaign_rows(&response);
        assert_eq!(rows[0].impressions, "0");
        assert_eq!(rows[0].ctr, "0.00%");
        assert_eq!(rows[0].cost, "0.00");
    }
}
