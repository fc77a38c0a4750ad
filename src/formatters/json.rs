use anyhow::Result;
use serde::Serialize;

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchResponse;
    use serde_json::json;

    #[test]
    fn test_format_search_response_keeps_everything() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [{"metrics": {"costMicros": "1500000"}, "campaign": {"name": "A"}}],
            "fieldMask": "campaign.name,metrics.costMicros",
            "requestId": "abc"
        }))
        .unwrap();

        let out = JsonFormatter::format(&response).unwrap();

        assert!(out.contains("\"fieldMask\": \"campaign.name,metrics.costMicros\""));
        assert!(out.contains("\"requestId\": \"abc\""));
        assert!(out.contains("\"costMicros\": \"1500000\""));
        // Row keys stay in the order the API sent them
        assert!(out.find("metrics").unwrap() < out.find("\"campaign\"").unwrap());
    }

    #[test]
    fn test_format_two_space_indent() {
        let out = JsonFormatter::format(&json!({"results": [{"a": 1}]})).unwrap();
        assert_eq!(out, "{\n  \"results\": [\n    {\n      \"a\": 1\n    }\n  ]\n}");
    }

    #[test]
    fn test_format_empty_array() {
        let data: Vec<serde_json::Value> = vec![];
        assert_eq!(JsonFormatter::format(&data).unwrap(), "[]");
    }

    #[test]
    fn test_format_special_characters() {
        let data = json!({"message": "Hello\nWorld\t\"Quoted\""});
        let result = JsonFormatter::format(&data).unwrap();

        assert!(result.contains("\\n"));
        assert!(result.contains("\\t"));
        assert!(result.contains("\\\""));
    }

    #[derive(Serialize)]
    struct KeywordRow {
        campaign: String,
        keyword: String,
        match_type: String,
    }

    #[test]
    fn test_format_records() {
        let data = vec![KeywordRow {
            campaign: "Spring".to_string(),
            keyword: "running shoes".to_string(),
            match_type: "Phrase".to_string(),
        }];
        let result = JsonFormatter::format(&data).unwrap();

        assert!(result.contains("\"campaign\": \"Spring\""));
        assert!(result.contains("\"match_type\": \"Phrase\""));
    }
}
