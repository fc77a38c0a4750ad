use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::client::AdsClient;
use crate::commands::{format_and_output, output_result, truncate, CommonArgs};
use crate::formatters::numbers::{micros_to_units, money, percent, thousands};
use crate::types::{date_range, OutputFormat, SearchResponse};

#[derive(Debug, Subcommand)]
pub enum AdsCommands {
    /// Ad metrics over a trailing window, top 100 by impressions
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
pub struct AdRow {
    #[serde(rename = "Ad")]
    pub ad: String,
    #[serde(rename = "Ad Group")]
    pub ad_group: String,
    #[serde(rename = "Campaign")]
    pub campaign: String,
    #[serde(rename = "Impressions")]
    pub impressions: String,
    #[serde(rename = "Clicks")]
    pub clicks: String,
    #[serde(rename = "CTR")]
    pub ctr: String,
    #[serde(rename = "Conversions")]
    pub conversions: String,
    #[serde(rename = "Cost")]
    pub cost: String,
}

impl AdsCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            AdsCommands::Performance {
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
                        "No ad performance data found for this customer ID and time period.",
                        common.output.as_deref(),
                    );
                }

                if matches!(format, OutputFormat::Table) {
                    eprintln!("Ad Performance for Customer ID {customer_id} (Last {days} days):");
                }
                format_and_output(&ad_rows(&response), *format, common.output.as_deref())
            }
        }
    }
}

pub fn performance_query(days: u32) -> String {
    format!(
        "SELECT ad_group_ad.ad.name, ad_group_ad.ad.id, ad_group.name, campaign.name, \
         metrics.impressions, metrics.clicks, metrics.ctr, metrics.conversions, \
         metrics.cost_micros \
         FROM ad_group_ad \
         WHERE segments.date DURING {} \
         ORDER BY metrics.impressions DESC \
         LIMIT 100",
        date_range(days)
    )
}

pub fn ad_rows(response: &SearchResponse) -> Vec<AdRow> {
    response
        .rows()
        .into_iter()
        .map(|row| {
            let ad = row.ad_group_ad.map(|a| a.ad).unwrap_or_default();
            let ad_name = ad.name.unwrap_or_else(|| {
                format!("Ad ID: {}", ad.id.as_deref().unwrap_or("N/A"))
            });
            let m = &row.metrics;
            AdRow {
                ad: truncate(&ad_name, 40),
                ad_group: truncate(row.ad_group.name.as_deref().unwrap_or("N/A"), 30),
                campaign: truncate(row.campaign.name.as_deref().unwrap_or("N/A"), 30),
                impressions: thousands(m.impressions()),
                clicks: thousands(m.clicks()),
                ctr: percent(m.ctr()),
                conversions: format!("{:.2}", m.conversions()),
                cost: money(micros_to_units(m.cost_micros() as f64)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_performance_query() {
        let query = performance_query(14);
        assert!(query.contains("FROM ad_group_ad"));
        assert!(query.contains("DURING LAST_14_DAYS"));
        assert!(query.ends_with("LIMIT 100"));
    }

    #[test]
    fn test_ad_rows_fall_back_to_ad_id() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [
                {
                    "adGroupAd": {"ad": {"id": "987"}},
                    "adGroup": {"name": "Shoes"},
                    "campaign": {"name": "Spring"},
                    "metrics": {"impressions": "2000", "clicks": "50", "ctr": 0.025, "costMicros": "3000000"}
                },
                {
                    "adGroupAd": {"ad": {"id": "988", "name": "Headline A"}},
                    "metrics": {}
                }
            ]
        }))
        .unwrap();

        let rows = ad_rows(&response);

        assert_eq!(rows[0].ad, "Ad ID: 987");
        assert_eq!(rows[0].ad_group, "Shoes");
        assert_eq!(rows[0].impressions, "2,000");
        assert_eq!(rows[0].ctr, "2.50%");
        assert_eq!(rows[0].cost, "3.00");
        assert_eq!(rows[1].ad, "Headline A");
        assert_eq!(rows[1].campaign, "N/A");
        assert_eq!(rows[1].conversions, "0.00");
    }
}
