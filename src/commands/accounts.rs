use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::client::AdsClient;
use crate::commands::{format_and_output, output_result, CommonArgs};
use crate::customer_id;
use crate::types::{OutputFormat, SearchResponse};

#[derive(Debug, Subcommand)]
pub enum AccountsCommands {
    /// List all accessible accounts
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show the currency an account reports in
    Currency {
        /// Customer ID (dashes allowed)
        customer_id: String,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, Serialize)]
pub struct AccountRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "Manager")]
    pub manager: String,
    #[serde(rename = "Test Account")]
    pub test_account: String,
}

impl AccountsCommands {
    pub async fn execute(&self) -> Result<()> {
        match self {
            AccountsCommands::List { format, common } => {
                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let customer_ids = client.list_accessible_customers().await?;
                let Some(first) = customer_ids.first() else {
                    return output_result(
                        "No accessible Google Ads accounts found.",
                        common.output.as_deref(),
                    );
                };

                // Any accessible account can route the detail query
                let response = client.execute(first, &details_query(&customer_ids)).await?;

                format_and_output(&account_rows(&response), *format, common.output.as_deref())
            }

            AccountsCommands::Currency {
                customer_id,
                common,
            } => {
                let settings = common.settings()?;
                let client = AdsClient::new(&settings)?;

                let query = format!(
                    "SELECT customer.currency_code FROM customer WHERE customer.id = '{}'",
                    customer_id::normalize(customer_id)
                );
                let response = client.execute(customer_id, &query).await?;

                output_result(
                    &currency_message(customer_id, &response),
                    common.output.as_deref(),
                )
            }
        }
    }
}

fn details_query(customer_ids: &[String]) -> String {
    let ids: Vec<String> = customer_ids
        .iter()
        .map(|id| customer_id::normalize(id).to_string())
        .collect();
    format!(
        "SELECT customer.id, customer.descriptive_name, customer.currency_code, \
         customer.manager, customer.test_account \
         FROM customer WHERE customer.id IN ({})",
        ids.join(", ")
    )
}

pub fn account_rows(response: &SearchResponse) -> Vec<AccountRow> {
    response
        .rows()
        .into_iter()
        .map(|row| {
            let customer = row.customer;
            AccountRow {
                id: customer.id.unwrap_or_else(|| "N/A".to_string()),
                name: customer.descriptive_name.unwrap_or_else(|| "N/A".to_string()),
                currency: customer.currency_code.unwrap_or_else(|| "N/A".to_string()),
                manager: customer.manager.unwrap_or(false).to_string(),
                test_account: customer.test_account.unwrap_or(false).to_string(),
            }
        })
        .collect()
}

pub fn currency_message(customer_id: &str, response: &SearchResponse) -> String {
    match response.rows().into_iter().next() {
        Some(row) => format!(
            "The currency for account {customer_id} is {}.",
            row.customer.currency_code.as_deref().unwrap_or("N/A")
        ),
        None => format!("Could not find currency for customer ID {customer_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_details_query_lists_every_id() {
        let query = details_query(&["1111111111".to_string(), "2222222222".to_string()]);
        assert!(query.ends_with("WHERE customer.id IN (1111111111, 2222222222)"));
    }

    #[test]
    fn test_details_query_normalizes_ids() {
        let query = details_query(&["123-456-7890".to_string(), "42".to_string()]);
        assert!(query.ends_with("WHERE customer.id IN (1234567890, 0000000042)"));
    }

    #[test]
    fn test_account_rows() {
        let rows = account_rows(&response(json!({
            "results": [
                {"customer": {"id": "1234567890", "descriptiveName": "Shop", "currencyCode": "EUR", "manager": true}},
                {"customer": {"id": "2222222222"}}
            ]
        })));

        assert_eq!(rows[0].id, "1234567890");
        assert_eq!(rows[0].currency, "EUR");
        assert_eq!(rows[0].manager, "true");
        assert_eq!(rows[0].test_account, "false");
        assert_eq!(rows[1].name, "N/A");
        assert_eq!(rows[1].currency, "N/A");
    }

    #[test]
    fn test_currency_message() {
        let found = response(json!({"results": [{"customer": {"currencyCode": "USD"}}]}));
        assert_eq!(
            currency_message("123-456-7890", &found),
            "The currency for account 123-456-7890 is USD."
        );

        let empty = response(json!({}));
        assert_eq!(
            currency_message("42", &empty),
            "Could not find currency for customer ID 42"
        );
    }
}
