use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::customer_id::{self, CustomerId};

/// Output format options
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Keyword match type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Broad,
    Phrase,
    Exact,
    Unspecified,
}

impl MatchType {
    /// Case-insensitive; anything unrecognized is `Unspecified`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "broad" => MatchType::Broad,
            "phrase" => MatchType::Phrase,
            "exact" => MatchType::Exact,
            _ => MatchType::Unspecified,
        }
    }

    pub fn to_api_string(&self) -> &str {
        match self {
            MatchType::Broad => "BROAD",
            MatchType::Phrase => "PHRASE",
            MatchType::Exact => "EXACT",
            MatchType::Unspecified => "UNSPECIFIED",
        }
    }
}

/// GAQL date range literal for a trailing window. Unsupported lengths use
/// the 30 day window.
pub fn date_range(days: u32) -> &'static str {
    match days {
        7 => "LAST_7_DAYS",
        14 => "LAST_14_DAYS",
        _ => "LAST_30_DAYS",
    }
}

/// One GAQL query against one account
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub customer_id: CustomerId,
    pub query: String,
}

impl QueryRequest {
    pub fn new(customer_id: impl std::fmt::Display, query: &str) -> Self {
        Self {
            customer_id: customer_id::normalize(customer_id),
            query: query.to_string(),
        }
    }

    pub fn body<'a>(&'a self, page_token: Option<&'a str>) -> SearchRequestBody<'a> {
        SearchRequestBody {
            query: &self.query,
            page_token,
        }
    }
}

/// Request payload for `googleAds:search`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestBody<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a str>,
}

/// Result set from `googleAds:search`. Rows keep the key order the API sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Typed view of every row
    pub fn rows(&self) -> Vec<SearchRow> {
        self.results.iter().map(SearchRow::from_row).collect()
    }
}

/// Response of `customers:listAccessibleCustomers`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibleCustomers {
    #[serde(default)]
    pub resource_names: Vec<String>,
}

impl AccessibleCustomers {
    /// Customer IDs from `customers/<id>` resource names
    pub fn customer_ids(&self) -> Vec<String> {
        self.resource_names
            .iter()
            .map(|name| name.rsplit('/').next().unwrap_or(name).to_string())
            .collect()
    }
}

/// Request payload for `adGroupCriteria:mutate`
#[derive(Debug, Clone, Serialize)]
pub struct MutateRequest {
    pub operations: Vec<AdGroupCriterionOperation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdGroupCriterionOperation {
    pub create: AdGroupCriterion,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupCriterion {
    pub ad_group: String,
    #[serde(rename = "type")]
    pub criterion_type: String,
    pub keyword: KeywordInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordInfo {
    pub text: String,
    pub match_type: String,
}

impl AdGroupCriterionOperation {
    /// Create a keyword criterion in an ad group
    pub fn create_keyword(
        customer_id: &CustomerId,
        ad_group_id: &str,
        text: &str,
        match_type: MatchType,
    ) -> Self {
        Self {
            create: AdGroupCriterion {
                ad_group: format!("customers/{customer_id}/adGroups/{}", ad_group_id.trim()),
                criterion_type: "KEYWORD".to_string(),
                keyword: KeywordInfo {
                    text: text.to_string(),
                    match_type: match_type.to_api_string().to_string(),
                },
            },
        }
    }
}

/// Response of a mutate call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateResponse {
    #[serde(default)]
    pub results: Vec<MutateResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateResult {
    #[serde(default)]
    pub resource_name: String,
}

/// Known record shapes of a search row. Missing resources decode to
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRow {
    pub customer: Customer,
    pub campaign: Campaign,
    pub metrics: Metrics,
    pub asset: Asset,
    pub ad_group: AdGroup,
    pub ad_group_ad: Option<AdGroupAd>,
}

impl SearchRow {
    pub fn from_row(row: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(row.clone())).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "row does not match known shapes");
            SearchRow::default()
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub descriptive_name: Option<String>,
    pub currency_code: Option<String>,
    pub manager: Option<bool>,
    pub test_account: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Campaign {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdGroup {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdGroupAd {
    pub ad: Ad,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ad {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Asset {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub image_asset: ImageAsset,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageAsset {
    pub full_size: ImageSize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageSize {
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub width_pixels: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub height_pixels: Option<i64>,
}

/// Metric values. int64 metrics arrive as JSON strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    #[serde(deserialize_with = "lenient_i64")]
    pub impressions: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub clicks: Option<i64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ctr: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub average_cpc: Option<f64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub cost_micros: Option<i64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub conversions: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub cost_per_conversion: Option<f64>,
}

impl Metrics {
    pub fn impressions(&self) -> i64 {
        self.impressions.unwrap_or(0)
    }

    pub fn clicks(&self) -> i64 {
        self.clicks.unwrap_or(0)
    }

    /// Click-through rate as a fraction
    pub fn ctr(&self) -> f64 {
        self.ctr.unwrap_or(0.0)
    }

    /// Average CPC in micros
    pub fn average_cpc(&self) -> f64 {
        self.average_cpc.unwrap_or(0.0)
    }

    pub fn cost_micros(&self) -> i64 {
        self.cost_micros.unwrap_or(0)
    }

    pub fn conversions(&self) -> f64 {
        self.conversions.unwrap_or(0.0)
    }

    /// Cost per conversion in micros
    pub fn cost_per_conversion(&self) -> f64 {
        self.cost_per_conversion.unwrap_or(0.0)
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_date_range() {
        assert_eq!(date_range(7), "LAST_7_DAYS");
        assert_eq!(date_range(14), "LAST_14_DAYS");
        assert_eq!(date_range(30), "LAST_30_DAYS");
        assert_eq!(date_range(90), "LAST_30_DAYS");
        assert_eq!(date_range(0), "LAST_30_DAYS");
    }

    #[test]
    fn test_match_type_parse() {
        assert_eq!(MatchType::parse("Broad"), MatchType::Broad);
        assert_eq!(MatchType::parse(" PHRASE "), MatchType::Phrase);
        assert_eq!(MatchType::parse("exact").to_api_string(), "EXACT");
        assert_eq!(MatchType::parse("fuzzy"), MatchType::Unspecified);
        assert_eq!(MatchType::parse("").to_api_string(), "UNSPECIFIED");
    }

    #[test]
    fn test_query_request_normalizes_and_serializes() {
        let request = QueryRequest::new("123-456-7890", "SELECT campaign.name FROM campaign");
        assert_eq!(request.customer_id.as_str(), "1234567890");

        let first = serde_json::to_value(request.body(None)).unwrap();
        assert_eq!(first, json!({"query": "SELECT campaign.name FROM campaign"}));

        let next = serde_json::to_value(request.body(Some("tok"))).unwrap();
        assert_eq!(next["pageToken"], "tok");
    }

    #[test]
    fn test_body_borrows_owned_page_token() {
        let request = QueryRequest::new(42, "Q");
        for token in ["page-2".to_string(), "page-3".to_string()] {
            let body = request.body(Some(&token));
            assert_eq!(body.page_token, Some(token.as_str()));
            assert_eq!(body.query, "Q");
        }
    }

    #[test]
    fn test_search_response_preserves_key_order_and_extras() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [{"metrics": {"clicks": "1"}, "campaign": {"name": "A"}}],
            "fieldMask": "campaign.name,metrics.clicks",
            "requestId": "r-1"
        }))
        .unwrap();

        let keys: Vec<&String> = response.results[0].keys().collect();
        assert_eq!(keys, ["metrics", "campaign"]);
        assert_eq!(response.extra["fieldMask"], "campaign.name,metrics.clicks");
        assert!(response.next_page_token.is_none());
    }

    #[test]
    fn test_metrics_lenient_numbers() {
        let parsed = SearchRow::from_row(&row(json!({
            "metrics": {
                "impressions": "12345",
                "clicks": 67,
                "ctr": 0.0543,
                "averageCpc": "1500000",
                "costMicros": "2500000",
                "conversions": 3.5,
                "costPerConversion": 714285.7
            }
        })));

        let m = parsed.metrics;
        assert_eq!(m.impressions(), 12345);
        assert_eq!(m.clicks(), 67);
        assert!((m.ctr() - 0.0543).abs() < 1e-12);
        assert_eq!(m.average_cpc(), 1_500_000.0);
        assert_eq!(m.cost_micros(), 2_500_000);
        assert_eq!(m.conversions(), 3.5);
    }

    #[test]
    fn test_missing_resources_use_defaults() {
        let parsed = SearchRow::from_row(&row(json!({"campaign": {"name": "Only"}})));
        assert_eq!(parsed.campaign.name.as_deref(), Some("Only"));
        assert_eq!(parsed.metrics.impressions(), 0);
        assert_eq!(parsed.metrics.ctr(), 0.0);
        assert!(parsed.customer.descriptive_name.is_none());
        assert!(parsed.ad_group_ad.is_none());
    }

    #[test]
    fn test_nested_shapes() {
        let parsed = SearchRow::from_row(&row(json!({
            "customer": {"id": 1234567890, "descriptiveName": "Shop", "manager": true},
            "asset": {
                "id": "55",
                "type": "IMAGE",
                "imageAsset": {"fullSize": {"url": "https://img", "widthPixels": "600", "heightPixels": 314}}
            },
            "adGroupAd": {"ad": {"id": "9"}}
        })));

        assert_eq!(parsed.customer.id.as_deref(), Some("1234567890"));
        assert_eq!(parsed.customer.manager, Some(true));
        assert_eq!(parsed.asset.asset_type.as_deref(), Some("IMAGE"));
        assert_eq!(parsed.asset.image_asset.full_size.width_pixels, Some(600));
        assert_eq!(parsed.asset.image_asset.full_size.height_pixels, Some(314));
        assert_eq!(
            parsed.ad_group_ad.unwrap().ad.id.as_deref(),
            Some("9")
        );
    }

    #[test]
    fn test_create_keyword_operation() {
        let customer = customer_id::normalize("123-456-7890");
        let request = MutateRequest {
            operations: vec![AdGroupCriterionOperation::create_keyword(
                &customer,
                " 555 ",
                "running shoes",
                MatchType::parse("phrase"),
            )],
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "operations": [{
                    "create": {
                        "adGroup": "customers/1234567890/adGroups/555",
                        "type": "KEYWORD",
                        "keyword": {"text": "running shoes", "matchType": "PHRASE"}
                    }
                }]
            })
        );
    }

    #[test]
    fn test_accessible_customer_ids() {
        let customers = AccessibleCustomers {
            resource_names: vec![
                "customers/1234567890".to_string(),
                "customers/42".to_string(),
            ],
        };
        assert_eq!(customers.customer_ids(), ["1234567890", "42"]);
    }
}
