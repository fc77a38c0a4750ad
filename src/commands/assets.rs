// ABOUTME: Asset reports: where an asset is linked and how image assets perform
// ABOUTME: Image metrics are aggregated per asset across campaign rows

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::client::AdsClient;
use crate::commands::{format_and_output, output_result, truncate, CommonArgs};
use crate::formatters::numbers::{percent, thousands};
use crate::types::{date_range, OutputFormat, SearchResponse};

const MAX_LISTED_CAMPAIGNS: usize = 5;

#[derive(Debug, Subcommand)]
pub enum AssetsCommands {
    /// Show the campaigns and ad groups an asset is linked to
    Usage {
        /// Customer ID (dashes allowed)
        customer_id: String,

        /// Asset ID
        asset_id: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Image asset performance aggregated per asset
    Images {
        /// Customer ID (dashes allowed)
        customer_id: String,

        /// Days to look back: 7, 14 or 30
        #[arg(short, long, default_value = "30")]
        days: u32,

        /// Output format. Table prints a per-asset report.
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Aggregated metrics for one image asset
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageAssetSummary {
    pub asset_id: String,
    pub name: String,
    pub url: Option<String>,
    pub dimensions: String,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: f64,
    pub cost_micros: i64,
    pub campaigns: BTreeSet<String>,
}

impl ImageAssetSummary {
    /// Click-through rate as a fraction, zero without impressions
    pub fn ctr(&self) -> f64 {
        if self.impressions > 0 {
            self.clicks as f64 / self.impressions as f64
        } else {
            0.0
        }
    }
}

impl AssetsCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            AssetsCommands::Usage {
                customer_id,
                asset_id,
                common,
            } => {
                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let response = client.execute(customer_id, &usage_query(asset_id)).await?;

                output_result(&usage_report(asset_id, &response), common.output.as_deref())
            }

            AssetsCommands::Images {
                customer_id,
                days,
                format,
                common,
            } => {
                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let response = client.execute(customer_id, &images_query(*days)).await?;
                if response.is_empty() {
                    return output_result(
                        "No image asset performance data found for this customer ID and time period.",
                        common.output.as_deref(),
                    );
                }

                let summaries = summarize_images(&response);
                match format {
                    OutputFormat::Table => {
                        let header = format!(
                            "Image Asset Performance Analysis for Customer ID {} (Last {days} days):",
                            crate::customer_id::normalize(customer_id)
                        );
                        output_result(&images_report(&header, &summaries), common.output.as_deref())
                    }
                    _ => format_and_output(&summaries, *format, common.output.as_deref()),
                }
            }
        }
    }
}

pub fn usage_query(asset_id: &str) -> String {
    format!(
        "SELECT asset.id, asset.name, asset.type, campaign.id, campaign.name, \
         ad_group.id, ad_group.name, ad_group_ad.ad.id, ad_group_ad.ad.name \
         FROM asset_link \
         WHERE asset.id = '{}'",
        asset_id.trim()
    )
}

pub fn usage_report(asset_id: &str, response: &SearchResponse) -> String {
    let rows = response.rows();
    let Some(first) = rows.first() else {
        return format!("Asset with ID {asset_id} not found or not in use.");
    };

    let mut lines = vec![
        format!("Usage report for Asset ID: {asset_id}"),
        "=".repeat(80),
        String::new(),
        format!("Asset ID: {asset_id}"),
        format!(
            "Name: {}",
            first
                .asset
                .name
                .clone()
                .unwrap_or_else(|| format!("Asset {asset_id}"))
        ),
        format!("Type: {}", first.asset.asset_type.as_deref().unwrap_or("N/A")),
    ];

    let usages: Vec<(String, String)> = rows
        .iter()
        .filter(|row| row.asset.id.as_deref() == Some(asset_id))
        .map(|row| {
            let campaign = format!(
                "{} ({})",
                row.campaign.name.as_deref().unwrap_or("N/A"),
                row.campaign.id.as_deref().unwrap_or("N/A")
            );
            let ad_group = format!(
                "{} ({})",
                row.ad_group.name.as_deref().unwrap_or("N/A"),
                row.ad_group.id.as_deref().unwrap_or("N/A")
            );
            (campaign, ad_group)
        })
        .collect();

    if !usages.is_empty() {
        lines.push(String::new());
        lines.push("Used in:".to_string());
        lines.push("-".repeat(60));
        lines.push(format!("{:<30} | {:<30}", "Campaign", "Ad Group"));
        lines.push("-".repeat(60));
        for (campaign, ad_group) in usages {
            lines.push(format!(
                "{:<30} | {:<30}",
                truncate(&campaign, 30),
                truncate(&ad_group, 30)
            ));
        }
    }
    lines.push("=".repeat(80));

    lines.join("\n")
}

pub fn images_query(days: u32) -> String {
    format!(
        "SELECT asset.id, asset.name, asset.image_asset.full_size.url, \
         asset.image_asset.full_size.width_pixels, asset.image_asset.full_size.height_pixels, \
         campaign.name, metrics.impressions, metrics.clicks, metrics.conversions, \
         metrics.cost_micros \
         FROM campaign_asset \
         WHERE asset.type = 'IMAGE' AND segments.date DURING {} \
         ORDER BY metrics.impressions DESC \
         LIMIT 200",
        date_range(days)
    )
}

/// Group rows by asset and sum their metrics, highest impressions first
pub fn summarize_images(response: &SearchResponse) -> Vec<ImageAssetSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut by_asset: HashMap<String, ImageAssetSummary> = HashMap::new();

    for row in response.rows() {
        let asset_id = row.asset.id.clone().unwrap_or_else(|| "N/A".to_string());
        let summary = by_asset.entry(asset_id.clone()).or_insert_with(|| {
            order.push(asset_id.clone());
            let size = &row.asset.image_asset.full_size;
            let dimension = |v: Option<i64>| v.map_or("N/A".to_string(), |px| px.to_string());
            ImageAssetSummary {
                name: row
                    .asset
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Asset {asset_id}")),
                url: size.url.clone(),
                dimensions: format!(
                    "{} x {}",
                    dimension(size.width_pixels),
                    dimension(size.height_pixels)
                ),
                asset_id: asset_id.clone(),
                impressions: 0,
                clicks: 0,
                conversions: 0.0,
                cost_micros: 0,
                campaigns: BTreeSet::new(),
            }
        });

        summary.impressions += row.metrics.impressions();
        summary.clicks += row.metrics.clicks();
        summary.conversions += row.metrics.conversions();
        summary.cost_micros += row.metrics.cost_micros();
        if let Some(name) = row.campaign.name.as_deref().filter(|n| !n.is_empty()) {
            summary.campaigns.insert(name.to_string());
        }
    }

    let mut summaries: Vec<ImageAssetSummary> = order
        .into_iter()
        .filter_map(|id| by_asset.remove(&id))
        .collect();
    // Stable, so ties keep the API's order
    summaries.sort_by(|a, b| b.impressions.cmp(&a.impressions));
    summaries
}

pub fn images_report(header: &str, summaries: &[ImageAssetSummary]) -> String {
    let mut lines = vec![header.to_string(), "=".repeat(100)];

    for s in summaries {
        lines.push(String::new());
        lines.push(format!("Asset ID: {}", s.asset_id));
        lines.push(format!("Name: {}", s.name));
        lines.push(format!("Dimensions: {}", s.dimensions));
        lines.push(String::new());
        lines.push("Performance Metrics:".to_string());
        lines.push(format!("  Impressions: {}", thousands(s.impressions)));
        lines.push(format!("  Clicks: {}", thousands(s.clicks)));
        lines.push(format!("  CTR: {}", percent(s.ctr())));
        lines.push(format!("  Conversions: {:.2}", s.conversions));
        lines.push(format!("  Cost (micros): {}", thousands(s.cost_micros)));
        lines.push(String::new());
        lines.push(format!("Used in {} campaigns:", s.campaigns.len()));
        for campaign in s.campaigns.iter().take(MAX_LISTED_CAMPAIGNS) {
            lines.push(format!("  - {campaign}"));
        }
        if s.campaigns.len() > MAX_LISTED_CAMPAIGNS {
            lines.push(format!(
                "  - ... and {} more",
                s.campaigns.len() - MAX_LISTED_CAMPAIGNS
            ));
        }
        if let Some(url) = &s.url {
            lines.push(String::new());
            lines.push(format!("Image URL: {url}"));
        }
        lines.push("-".repeat(100));
    }

    lines.join("\n")
}
