use super::EnforcementSource;
use crate::domain::{DedupKey, EnforcementRecord, RawRecord, SchemaVariant};
use crate::infrastructure::clients::PageRequest;
use crate::services::extraction::absolutize_url;
use crate::services::normalize::{
    classify_violation, collapse_whitespace, date_field, truncate_chars, ViolationGroup,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://www.ftc.gov";
pub const DEFAULT_LISTING_URL: &str = "https://www.ftc.gov/legal-library/browse/cases-proceedings?sort_by=search_api_relevance&items_per_page=20&field_case_action_type%5BFederal%5D=Federal&field_case_action_type%5BAdministrative%5D=Administrative";

const CASE_PATH: &str = "/legal-library/browse/cases-proceedings/";
const TOPIC_PATH: &str = "/enforcement/cases-proceedings/terms/";
const PRESS_RELEASE_PATH: &str = "/news-events/news/press-releases/";
const CASE_DOCUMENT_PATH: &str = "/sites/default/files/documents/cases/";
const MAX_ORDER_DOCUMENTS: usize = 3;
const AGENCY: &str = "Federal Trade Commission";
const SUMMARY_LEN: usize = 500;

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static CASE_SUMMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.field--name-field-case-summary").unwrap());
static IN_THE_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is),?\s*In the Matter of.*").unwrap());

static FINE_PATTERNS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    [
        (r"(?i)\$([0-9,]+(?:\.[0-9]+)?)\s*million", 1_000_000.0),
        (r"(?i)\$([0-9,]+(?:\.[0-9]+)?)\s*billion", 1_000_000_000.0),
        (r"(?i)pay\s*\$([0-9,]+)", 1.0),
        (r"(?i)penalty\s+of\s*\$([0-9,]+)", 1.0),
        (r"(?i)fine\s+of\s*\$([0-9,]+)", 1.0),
    ]
    .into_iter()
    .map(|(pattern, scale)| (Regex::new(pattern).unwrap(), scale))
    .collect()
});

/// Dollar amount named in free text, from the first phrase pattern that
/// matches: "$X million", "$X billion", "pay $X", "penalty of $X",
/// "fine of $X". Zero when none does.
pub fn extract_fine_amount(text: &str) -> u64 {
    for (pattern, scale) in FINE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let amount = caps[1].replace(',', "").parse::<f64>().unwrap_or(0.0);
            return (amount * scale).trunc() as u64;
        }
    }
    0
}

/// Value following `label:` up to the end of its line.
fn line_value(text: &str, label: &str) -> String {
    let pattern = format!(r"{}:[ \t]*([^\n]*)", regex::escape(label));
    Regex::new(&pattern)
        .ok()
        .and_then(|re| re.captures(text).map(|caps| caps[1].trim().to_string()))
        .unwrap_or_default()
}

/// FTC "Cases and Proceedings": listing pages link to case pages, which
/// carry everything the output record needs.
pub struct FtcCasesSource {
    base_url: String,
    listing_url: String,
}

impl FtcCasesSource {
    pub fn new(base_url: Option<&str>, listing_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            listing_url: listing_url.unwrap_or(DEFAULT_LISTING_URL).to_string(),
        }
    }

    fn case_slug(url: &str) -> &str {
        url.trim_end_matches('/').rsplit('/').next().unwrap_or("")
    }

    /// Consent and order documents linked from a press release.
    fn order_documents(&self, document: &Html) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for href in document.select(&ANCHORS).filter_map(|a| a.value().attr("href")) {
            let is_document = href.contains(CASE_DOCUMENT_PATH)
                || [".htm", ".html", ".pdf"].iter().any(|ext| href.ends_with(ext));
            if !is_document {
                continue;
            }
            let url = absolutize_url(href, &self.base_url);
            if !urls.contains(&url) {
                urls.push(url);
            }
            if urls.len() >= MAX_ORDER_DOCUMENTS {
                break;
            }
        }
        urls
    }
}

fn has_fine(row: &RawRecord) -> bool {
    !matches!(row.get("FINE"), "" | "0")
}

impl EnforcementSource for FtcCasesSource {
    fn name(&self) -> &str {
        "FTC"
    }

    fn checkpoint_key(&self) -> String {
        "ftc_cases".to_string()
    }

    fn schema(&self) -> SchemaVariant {
        SchemaVariant::Canonical
    }

    fn page_request(&self, page: u32) -> PageRequest {
        if page <= 1 {
            return PageRequest::get(self.listing_url.clone());
        }
        let separator = if self.listing_url.contains('?') { '&' } else { '?' };
        PageRequest::get(format!("{}{}page={}", self.listing_url, separator, page - 1))
    }

    fn parse_listing(&self, body: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(body);
        let mut links: Vec<String> = Vec::new();

        for href in document.select(&ANCHORS).filter_map(|a| a.value().attr("href")) {
            if !href.contains(CASE_PATH) {
                continue;
            }
            let url = absolutize_url(href, &self.base_url);
            let url = url.split('?').next().unwrap_or_default().to_string();
            if url.to_lowercase().contains("banned-debt-collectors") || links.contains(&url) {
                continue;
            }
            links.push(url);
        }

        links
            .into_iter()
            .map(|url| RawRecord::new().with("CASE_URL", url))
            .collect()
    }

    fn listing_key(&self, row: &RawRecord) -> DedupKey {
        DedupKey::new(row.get("CASE_URL"), "", "", "US")
    }

    fn record_key(&self, record: &EnforcementRecord) -> DedupKey {
        DedupKey::new(&record.source_url, "", "", "US")
    }

    fn detail_request(&self, row: &RawRecord) -> Option<PageRequest> {
        Some(PageRequest::get(row.get("CASE_URL")))
    }

    fn parse_detail(&self, body: &str) -> RawRecord {
        let document = Html::parse_document(body);
        let text: String = document.root_element().text().collect();
        let mut fields = RawRecord::new();

        if let Some(h1) = document.select(&TITLE).next() {
            let title = collapse_whitespace(&h1.text().collect::<String>());
            fields.insert("COMPANY", IN_THE_MATTER.replace(&title, "").trim().to_string());
            fields.insert("CASE_NAME", title);
        }

        let topics: Vec<String> = document
            .select(&ANCHORS)
            .filter(|a| a.value().attr("href").is_some_and(|h| h.contains(TOPIC_PATH)))
            .map(|a| collapse_whitespace(&a.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .collect();
        if !topics.is_empty() {
            fields.insert("TOPICS", topics.join(", "));
        }

        for (label, key) in [
            ("Last Updated", "LAST_UPDATED"),
            ("Case Status", "CASE_STATUS"),
            ("FTC Matter/File Number", "FILE_NUMBER"),
            ("Enforcement Type", "ENFORCEMENT_TYPE"),
        ] {
            let value = line_value(&text, label);
            if !value.is_empty() {
                fields.insert(key, value);
            }
        }

        if let Some(summary) = document.select(&CASE_SUMMARY).next() {
            let summary = collapse_whitespace(&summary.text().collect::<String>());
            fields.insert("SUMMARY", truncate_chars(&summary, SUMMARY_LEN));
        }

        fields.insert("FINE", extract_fine_amount(&text).to_string());

        let press_release = document
            .select(&ANCHORS)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| href.contains(PRESS_RELEASE_PATH));
        if let Some(href) = press_release {
            fields.insert("PENDING_URLS", absolutize_url(href, &self.base_url));
            fields.insert("FOLLOW_UP_STAGE", "press_release");
        }
        fields
    }

    // Fines missing from the case page are looked up in the press release,
    // then in up to three consent or order documents it links to.
    fn follow_up_request(&self, row: &RawRecord) -> Option<PageRequest> {
        if has_fine(row) {
            return None;
        }
        row.get("PENDING_URLS")
            .lines()
            .next()
            .filter(|url| !url.is_empty())
            .map(PageRequest::get)
    }

    fn parse_follow_up(&self, row: &RawRecord, body: &str) -> RawRecord {
        let document = Html::parse_document(body);
        let text: String = document.root_element().text().collect();

        let pending: Vec<String> = if row.get("FOLLOW_UP_STAGE") == "press_release" {
            self.order_documents(&document)
        } else {
            row.get("PENDING_URLS").lines().skip(1).map(str::to_string).collect()
        };

        let fine = extract_fine_amount(&text);
        if fine > 0 {
            info!("  fine found in follow-up document: {} USD", fine);
        }
        RawRecord::new()
            .with("FINE", fine.to_string())
            .with("PENDING_URLS", pending.join("\n"))
            .with("FOLLOW_UP_STAGE", "order")
    }

    fn normalize(&self, row: &RawRecord) -> EnforcementRecord {
        let url = row.get("CASE_URL");
        let file_number = row.get("FILE_NUMBER").replace(' ', "");
        let enforcement_id = if file_number.is_empty() {
            format!("US_FTC_{}", Self::case_slug(url))
        } else {
            format!("US_FTC_{file_number}")
        };

        let violation_type = row.get("TOPICS").to_string();
        let group = match classify_violation(&violation_type) {
            ViolationGroup::Other => ViolationGroup::ConsumerProtection,
            group => group,
        };

        let fine = row.get("FINE");
        EnforcementRecord {
            enforcement_id,
            country_code: "US".to_string(),
            company_name: row.get("COMPANY").to_string(),
            sector: String::new(),
            violation_group: group.label().to_string(),
            violation_type,
            enforcement_date: date_field(row.get("LAST_UPDATED")),
            fine_amount_usd: if fine.is_empty() { "0".to_string() } else { fine.to_string() },
            enforcing_agency: AGENCY.to_string(),
            summary: row.get("SUMMARY").to_string(),
            source_url: url.to_string(),
            ..Default::default()
        }
    }
}
