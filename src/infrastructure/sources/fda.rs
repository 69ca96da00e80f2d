use super::EnforcementSource;
use crate::domain::{DedupKey, EnforcementRecord, RawRecord, SchemaVariant};
use crate::infrastructure::clients::PageRequest;
use crate::services::normalize::{
    classify_violation, date_field_with, truncate_chars, ViolationGroup, DATE_FORMATS,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://api-datadashboard.fda.gov/v1/complianceactions";
pub const MAX_ROWS_PER_PAGE: u32 = 5000;

/// The dashboard API reports success with this body status.
const STATUS_OK: i64 = 400;
const AGENCY: &str = "Food and Drug Administration";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    statuscode: Option<i64>,
    message: Option<String>,
    #[serde(default)]
    result: Vec<serde_json::Map<String, Value>>,
}

/// FDA Data Dashboard compliance actions (warning letters, injunctions,
/// seizures), paged through the `start`/`rows` body fields.
pub struct FdaComplianceSource {
    api_url: String,
    auth_user: String,
    auth_key: String,
    filters: Value,
    rows_per_page: u32,
}

impl FdaComplianceSource {
    pub fn new(
        auth_user: &str,
        auth_key: &str,
        filter: &FdaFilter,
        api_url: Option<&str>,
    ) -> Self {
        let mut filters = serde_json::Map::new();
        filters.insert("ActionTakenDateFrom".into(), json!([filter.start_date]));
        if let Some(end) = &filter.end_date {
            filters.insert("ActionTakenDateTo".into(), json!([end]));
        }
        if !filter.product_types.is_empty() {
            filters.insert("ProductType".into(), json!(filter.product_types));
        }
        if !filter.action_types.is_empty() {
            filters.insert("ActionType".into(), json!(filter.action_types));
        }

        Self {
            api_url: api_url.unwrap_or(DEFAULT_API_URL).to_string(),
            auth_user: auth_user.to_string(),
            auth_key: auth_key.to_string(),
            filters: Value::Object(filters),
            rows_per_page: filter.rows_per_page.clamp(1, MAX_ROWS_PER_PAGE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FdaFilter {
    pub product_types: Vec<String>,
    pub action_types: Vec<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub rows_per_page: u32,
}

impl Default for FdaFilter {
    fn default() -> Self {
        Self {
            product_types: Vec::new(),
            action_types: Vec::new(),
            start_date: "2020-01-01".to_string(),
            end_date: None,
            rows_per_page: MAX_ROWS_PER_PAGE,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn action_date(raw: &str) -> String {
    let mut formats = DATE_FORMATS.to_vec();
    formats.push("%m/%d/%Y");
    date_field_with(raw, &formats)
}

impl EnforcementSource for FdaComplianceSource {
    fn name(&self) -> &str {
        "FDA"
    }

    fn checkpoint_key(&self) -> String {
        "fda_compliance".to_string()
    }

    fn schema(&self) -> SchemaVariant {
        SchemaVariant::Canonical
    }

    fn page_request(&self, page: u32) -> PageRequest {
        let start = (page.max(1) - 1) * self.rows_per_page + 1;
        let body = json!({
            "filters": self.filters,
            "columns": [],
            "sort": "ActionTakenDate",
            "sortorder": "DESC",
            "rows": self.rows_per_page,
            "start": start,
            "returntotalcount": true,
        });

        PageRequest::post_json(self.api_url.clone(), body)
            .header("Content-Type", "application/json")
            .header("Authorization-User", self.auth_user.clone())
            .header("Authorization-Key", self.auth_key.clone())
    }

    fn parse_listing(&self, body: &str) -> Vec<RawRecord> {
        let response: ApiResponse = match serde_json::from_str(body) {
            Ok(response) => response,
            Err(e) => {
                warn!("FDA: unreadable response: {}", e);
                return Vec::new();
            }
        };

        if response.statuscode != Some(STATUS_OK) {
            warn!(
                "FDA: API error {:?}: {}",
                response.statuscode,
                response.message.unwrap_or_default()
            );
            return Vec::new();
        }

        response
            .result
            .into_iter()
            .map(|row| row.into_iter().map(|(k, v)| (k, value_text(&v))).collect::<RawRecord>())
            .collect()
    }

    fn listing_key(&self, row: &RawRecord) -> DedupKey {
        DedupKey::new(
            row.get("FirmName"),
            &action_date(row.get("ActionTakenDate")),
            "0",
            "US",
        )
    }

    fn record_key(&self, record: &EnforcementRecord) -> DedupKey {
        DedupKey::new(
            &record.company_name,
            &record.enforcement_date,
            &record.fine_amount_usd,
            &record.country_code,
        )
    }

    fn normalize(&self, row: &RawRecord) -> EnforcementRecord {
        let id = row.first_of(&["CaseInjunctionID", "FEINumber"]);
        let action_type = row.get("ActionType");
        let product_type = row.get("ProductType");

        let group = match classify_violation(&format!("{action_type} {product_type}")) {
            ViolationGroup::Other => ViolationGroup::ConsumerProtection,
            group => group,
        };

        EnforcementRecord {
            enforcement_id: if id.is_empty() {
                String::new()
            } else {
                format!("US_FDA_{id}")
            },
            country_code: "US".to_string(),
            company_name: row.get("FirmName").to_string(),
            sector: product_type.to_string(),
            violation_group: group.label().to_string(),
            violation_type: action_type.to_string(),
            enforcement_date: action_date(row.get("ActionTakenDate")),
            enforcing_agency: match row.get("CenterName") {
                "" => AGENCY.to_string(),
                center => format!("{AGENCY} ({center})"),
            },
            summary: truncate_chars(row.first_of(&["Citation", "Subject"]), 500),
            ..Default::default()
        }
    }
}
