mod csv_formatter;
mod json;
pub mod numbers;
mod table;

pub use csv_formatter::CsvFormatter;
pub use json::JsonFormatter;
pub use table::TableFormatter;

use anyhow::Result;
use serde::Serialize;

use crate::types::{OutputFormat, SearchResponse};

/// Printed in place of an empty table or CSV result set
pub const NO_RESULTS: &str = "Query returned no results.";

/// Format report records according to the specified output format
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => TableFormatter::format(data),
        OutputFormat::Json => JsonFormatter::format(data),
        OutputFormat::Csv => CsvFormatter::format(data),
    }
}

/// Format a raw GAQL result set
pub fn format_results(response: &SearchResponse, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => JsonFormatter::format(response),
        _ if response.is_empty() => Ok(NO_RESULTS.to_string()),
        OutputFormat::Table => TableFormatter::format_results(&response.results),
        OutputFormat::Csv => CsvFormatter::format_results(&response.results),
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
    fn test_empty_results() {
        let empty = response(json!({"results": []}));
        assert_eq!(format_results(&empty, OutputFormat::Table).unwrap(), NO_RESULTS);
        assert_eq!(format_results(&empty, OutputFormat::Csv).unwrap(), NO_RESULTS);

        let json = format_results(&empty, OutputFormat::Json).unwrap();
        assert_ne!(json, NO_RESULTS);
        assert!(json.contains("\"results\": []"));
    }

    #[test]
    fn test_missing_results_key_is_empty() {
        let empty = response(json!({"fieldMask": "campaign.id"}));
        assert_eq!(format_results(&empty, OutputFormat::Table).unwrap(), NO_RESULTS);
    }

    #[test]
    fn test_dispatch() {
        let data = response(json!({"results": [{"campaign": {"id": "1"}}]}));

        let csv = format_results(&data, OutputFormat::Csv).unwrap();
        assert!(csv.starts_with("campaign\n"));

        let table = format_results(&data, OutputFormat::Table).unwrap();
        assert!(table.starts_with("campaign"));
        assert!(table.contains("\"id\": \"1\""));
    }
}
