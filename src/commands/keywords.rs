// ABOUTME: Keyword creation, single or synced from a local CSV file
// ABOUTME: CSV columns are campaign, ad_group, keyword, match_type

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::client::AdsClient;
use crate::commands::{format_and_output, output_result, CommonArgs};
use crate::customer_id;
use crate::types::{AdGroupCriterionOperation, MatchType, OutputFormat, SearchResponse};

const DEFAULT_KEYWORDS_FILE: &str = "keywords.csv";

#[derive(Debug, Subcommand)]
pub enum KeywordsCommands {
    /// Create a keyword in an ad group
    Create {
        /// Customer ID (dashes allowed)
        customer_id: String,

        /// Ad group ID
        ad_group_id: String,

        /// Keyword text
        text: String,

        /// Match type: broad, phrase or exact
        #[arg(short, long, default_value = "broad")]
        match_type: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Create every keyword listed for a campaign in the keywords file
    Sync {
        /// Customer ID (dashes allowed)
        customer_id: String,

        /// Campaign name, matched case-insensitively against the file
        campaign: String,

        /// Keywords CSV file
        #[arg(long, default_value = DEFAULT_KEYWORDS_FILE)]
        file: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the keywords file
    List {
        /// Keywords CSV file
        #[arg(long, default_value = DEFAULT_KEYWORDS_FILE)]
        file: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// One row of the keywords file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub campaign: String,
    pub ad_group: String,
    pub keyword: String,
    #[serde(default)]
    pub match_type: String,
}

impl KeywordsCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            KeywordsCommands::Create {
                customer_id,
                ad_group_id,
                text,
                match_type,
                common,
            } => {
                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let customer = customer_id::normalize(customer_id);
                let operation = AdGroupCriterionOperation::create_keyword(
                    &customer,
                    ad_group_id,
                    text,
                    MatchType::parse(match_type),
                );
                let response = client
                    .mutate_ad_group_criteria(&customer, vec![operation])
                    .await
                    .context("Error creating keyword")?;

                format_and_output(&response, OutputFormat::Json, common.output.as_deref())
            }

            KeywordsCommands::Sync {
                customer_id,
                campaign,
                file,
                common,
            } => {
                let records = read_keywords(Path::new(file))?;
                let selected = for_campaign(&records, campaign);
                if selected.is_empty() {
                    return output_result(
                        &format!("No keywords found for campaign '{campaign}' in {file}"),
                        common.output.as_deref(),
                    );
                }

                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let response = client
                    .execute(customer_id, &ad_groups_query(campaign))
                    .await
                    .context("Error fetching ad groups")?;
                let ad_groups = ad_group_ids(&response);

                let customer = customer_id::normalize(customer_id);
                let mut summary = Vec::with_capacity(selected.len());
                for record in selected {
                    let Some(ad_group_id) = ad_groups.get(&record.ad_group) else {
                        summary.push(format!(
                            "Ad group '{}' not found in campaign '{campaign}'.",
                            record.ad_group
                        ));
                        continue;
                    };

                    let operation = AdGroupCriterionOperation::create_keyword(
                        &customer,
                        ad_group_id,
                        &record.keyword,
                        MatchType::parse(&record.match_type),
                    );
                    match client.mutate_ad_group_criteria(&customer, vec![operation]).await {
                        Ok(_) => summary.push(format!(
                            "Successfully created keyword '{}' in ad group '{}'.",
                            record.keyword, record.ad_group
                        )),
                        Err(e) => {
                            tracing::warn!(keyword = %record.keyword, error = %e, "keyword creation failed");
                            summary.push(format!(
                                "Failed to create keyword '{}': {e}",
                                record.keyword
                            ))
                        }
                    }
                }

                output_result(&summary.join("\n"), common.output.as_deref())
            }

            KeywordsCommands::List {
                file,
                format,
                output,
            } => {
                let records = read_keywords(Path::new(file))?;
                format_and_output(&records, *format, output.as_deref())
            }
        }
    }
}

pub fn read_keywords(path: &Path) -> Result<Vec<KeywordRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("The file {} was not found.", path.display()))?;
    parse_keywords(file).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_keywords<R: Read>(reader: R) -> Result<Vec<KeywordRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for record in rdr.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

pub fn for_campaign<'a>(records: &'a [KeywordRecord], campaign: &str) -> Vec<&'a KeywordRecord> {
    let wanted = campaign.to_lowercase();
    records
        .iter()
        .filter(|r| r.campaign.to_lowercase() == wanted)
        .collect()
}

pub fn ad_groups_query(campaign: &str) -> String {
    format!(
        "SELECT ad_group.id, ad_group.name FROM ad_group WHERE campaign.name = '{}'",
        campaign.replace('\'', "\\'")
    )
}

/// Ad group name to ID
pub fn ad_group_ids(response: &SearchResponse) -> HashMap<String, String> {
    response
        .rows()
        .into_iter()
        .filter_map(|row| Some((row.ad_group.name?, row.ad_group.id?)))
        .collect()
}
