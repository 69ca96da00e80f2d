use super::EnforcementSource;
use crate::domain::{DedupKey, EnforcementRecord, RawRecord, SchemaVariant};
use crate::error::{HarvestError, Result};
use crate::infrastructure::clients::PageRequest;
use crate::services::extraction::{
    absolutize_url, resolve_source_link, FieldExtractor, DEFAULT_SECTION_BOUNDARIES,
};
use crate::services::normalize::{
    amount_field, collapse_whitespace, currency_code, date_field, digits_field, year_of,
};
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://violationtrackerglobal.goodjobsfirst.org";

/// Detail page labels in priority order. Longer labels come before the
/// shorter ones they end with.
const DETAIL_LABELS: &[(&str, &str)] = &[
    (
        "U.S. Dollar Equivalent at the Time of the Penalty Announcement",
        "PENALTY_AMOUNT_USD",
    ),
    ("Parent at the Time of the Penalty Announcement", "PARENT_AT_TIME"),
    ("Penalty Amount in Original Currency", "PENALTY_AMOUNT_ORIGINAL"),
    ("HQ Country of Current Parent", "HQ_COUNTRY"),
    ("Ownership Structure of Current Parent", "OWNERSHIP_STRUCTURE"),
    ("Major Industry of Current Parent", "MAJOR_INDUSTRY"),
    ("Specific Industry of Current Parent", "SPECIFIC_INDUSTRY"),
    ("Current Parent Company", "CURRENT_PARENT_COMPANY"),
    ("Penalty Currency", "PENALTY_CURRENCY"),
    ("Source of Data", "SOURCE"),
    ("Offense Group", "OFFENSE_GROUP"),
    ("Offense Category", "OFFENSE_CATEGORY"),
    ("VTG Record ID", "VTG_RECORD_ID"),
    ("Company", "COMPANY"),
    ("Jurisdiction", "JURISDICTION"),
    ("Region", "REGION"),
    ("Year", "YEAR"),
    ("Date", "DATE"),
    ("Agency", "AGENCY"),
    ("Description", "DESCRIPTION"),
];

const LISTING_COLUMNS: [&str; 6] = [
    "COMPANY",
    "CURRENT PARENT",
    "CURRENT PARENT INDUSTRY",
    "OFFENSE CATEGORY",
    "YEAR",
    "PENALTY AMOUNT (USD)",
];

static TABLES: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

/// Violation Tracker Global summary search for one jurisdiction.
pub struct ViolationTrackerSource {
    jurisdiction: String,
    country_code: String,
    base_url: String,
    search_url: Url,
    schema: SchemaVariant,
    extractor: FieldExtractor,
}

impl ViolationTrackerSource {
    pub fn new(
        jurisdiction: &str,
        country_code: &str,
        base_url: Option<&str>,
        schema: SchemaVariant,
    ) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let search_url = Url::parse_with_params(
            &format!("{base_url}/summary"),
            &[
                ("company_op", "starts"),
                ("company", ""),
                ("reporting_date_parent_op", "starts"),
                ("reporting_date_parent", ""),
                ("penalty_op", ">"),
                ("penalty", ""),
                ("offense_group", ""),
                ("jurisdiction[]", jurisdiction),
                ("free_text", ""),
            ],
        )
        .map_err(|e| HarvestError::Config(format!("invalid base url {base_url}: {e}")))?;

        Ok(Self {
            jurisdiction: jurisdiction.to_string(),
            country_code: country_code.to_string(),
            base_url,
            search_url,
            schema,
            extractor: FieldExtractor::new(DETAIL_LABELS)
                .with_free_text("DESCRIPTION", DEFAULT_SECTION_BOUNDARIES),
        })
    }

    fn parse_row(&self, row: ElementRef) -> Option<RawRecord> {
        let cells: Vec<ElementRef> = row.select(&CELLS).collect();
        if cells.len() < LISTING_COLUMNS.len() {
            return None;
        }

        let company_link = cells[0].select(&LINK).next();
        let company = company_link.map(cell_text).unwrap_or_else(|| cell_text(cells[0]));
        let detail_url = company_link
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolutize_url(href, &self.base_url))
            .unwrap_or_default();

        let mut record = RawRecord::new().with(LISTING_COLUMNS[0], company);
        for (column, cell) in LISTING_COLUMNS.iter().zip(&cells).skip(1) {
            record.insert(column, cell_text(*cell));
        }
        record.insert("JURISDICTION", self.jurisdiction.clone());
        record.insert("DETAIL_URL", detail_url);
        Some(record)
    }
}

fn cell_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

impl EnforcementSource for ViolationTrackerSource {
    fn name(&self) -> &str {
        &self.jurisdiction
    }

    fn checkpoint_key(&self) -> String {
        format!("violation_tracker_{}", self.country_code)
    }

    fn schema(&self) -> SchemaVariant {
        self.schema
    }

    fn page_request(&self, page: u32) -> PageRequest {
        let mut url = self.search_url.clone();
        if page > 1 {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        PageRequest::get(url.to_string())
    }

    fn parse_listing(&self, body: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(body);
        let Some(table) = document.select(&TABLES).nth(1) else {
            debug!("{}: no data table on page", self.jurisdiction);
            return Vec::new();
        };

        table
            .select(&ROWS)
            .skip(1)
            .filter_map(|row| self.parse_row(row))
            .collect()
    }

    fn listing_key(&self, row: &RawRecord) -> DedupKey {
        DedupKey::new(
            row.get("COMPANY"),
            row.get("YEAR"),
            &amount_field(row.get("PENALTY AMOUNT (USD)")),
            row.get("JURISDICTION"),
        )
    }

    fn record_key(&self, record: &EnforcementRecord) -> DedupKey {
        DedupKey::new(
            &record.company_name,
            year_of(&record.enforcement_date),
            &record.fine_amount_usd,
            &self.jurisdiction,
        )
    }

    fn detail_request(&self, row: &RawRecord) -> Option<PageRequest> {
        let url = row.get("DETAIL_URL");
        (!url.is_empty()).then(|| PageRequest::get(url))
    }

    fn parse_detail(&self, body: &str) -> RawRecord {
        let document = Html::parse_document(body);
        let text: String = document.root_element().text().collect();
        let mut fields = self.extractor.extract(&text);

        if !fields.contains("SOURCE") {
            if let Some(link) = resolve_source_link(&document, &self.base_url) {
                fields.insert("SOURCE", link);
            }
        }

        let summary: Vec<String> = ["DATE", "PENALTY_AMOUNT_USD", "AGENCY", "OFFENSE_CATEGORY"]
            .iter()
            .filter(|key| fields.contains(key))
            .map(|key| format!("{}={}", key, fields.get(key)))
            .collect();
        if !summary.is_empty() {
            info!("  extracted {}", summary.join(", "));
        }
        fields
    }

    fn normalize(&self, row: &RawRecord) -> EnforcementRecord {
        let original = row.get("PENALTY_AMOUNT_ORIGINAL");
        EnforcementRecord {
            enforcement_id: row.get("VTG_RECORD_ID").to_string(),
            country_code: self.country_code.clone(),
            company_name: row.first_of(&["COMPANY", "CURRENT_PARENT_COMPANY"]).to_string(),
            sector: row
                .first_of(&["MAJOR_INDUSTRY", "CURRENT PARENT INDUSTRY"])
                .to_string(),
            violation_group: row.get("OFFENSE_GROUP").to_string(),
            violation_type: row.first_of(&["OFFENSE_CATEGORY", "OFFENSE CATEGORY"]).to_string(),
            enforcement_date: date_field(row.get("DATE")),
            fine_amount_usd: amount_field(
                row.first_of(&["PENALTY_AMOUNT_USD", "PENALTY AMOUNT (USD)"]),
            ),
            fine_amount_original: digits_field(original),
            currency: currency_code(row.get("PENALTY_CURRENCY")),
            enforcing_agency: row.get("AGENCY").to_string(),
            summary: row.get("DESCRIPTION").to_string(),
            source_url: row.get("SOURCE").to_string(),
        }
    }
}
