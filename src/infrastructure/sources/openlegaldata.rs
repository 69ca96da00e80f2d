use super::EnforcementSource;
use crate::domain::{DedupKey, EnforcementRecord, RawRecord, SchemaVariant};
use crate::infrastructure::clients::PageRequest;
use crate::services::normalize::{
    classify_violation, collapse_whitespace, date_field, truncate_chars,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_API_URL: &str = "https://de.openlegaldata.io/api/cases/";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const CASE_URL: &str = "https://de.openlegaldata.io/cases/";
const AGENCY: &str = "OpenLegalData";
const SUMMARY_LEN: usize = 500;

/// Substrings that mark a decision as involving a company, with weights.
const COMPANY_KEYWORDS: &[(&str, usize)] = &[
    ("gmbh", 3),
    ("ag", 3),
    ("ltd", 2),
    ("limited", 2),
    ("unternehmen", 1),
    ("firma", 1),
    ("gesellschaft", 1),
    ("konzern", 1),
    ("betrieb", 1),
    ("gewerbe", 1),
];

const EXCLUDED_TERMS: &[&str] = &["Tenor", "Urteil", "Beschluss", "Kläger", "Beklagte", "Antrag"];

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static COMPANY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b([A-ZÄÖÜ][a-zA-ZäöüÄÖÜß\s&.\-]{3,}(?:GmbH|AG|Ltd|Limited|SE|KG|OHG|GbR|UG|mbH))\b",
        r"(?i)gegen\s+([A-ZÄÖÜ][a-zA-ZäöüÄÖÜß\s&.\-]{3,}(?:GmbH|AG|Ltd|Limited|SE|KG|OHG|GbR|UG|mbH))\b",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

#[derive(Debug, Deserialize)]
struct CasePage {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    court: Option<Court>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Court {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    jurisdiction: Option<String>,
}

/// Weighted count of company keywords in `content`.
pub fn keyword_score(content: &str) -> usize {
    let folded = content.nfkc().collect::<String>().to_lowercase();
    COMPANY_KEYWORDS
        .iter()
        .map(|(keyword, weight)| folded.matches(keyword).count() * weight)
        .sum()
}

/// Longest company name with a legal-form suffix in the decision text.
pub fn company_in_decision(text: &str) -> String {
    COMPANY_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| {
            let len = name.chars().count();
            len > 5 && len < 100 && !EXCLUDED_TERMS.iter().any(|term| name.contains(term))
        })
        .max_by_key(|name| name.chars().count())
        .unwrap_or_default()
}

/// German court decisions from the OpenLegalData API, kept when the text
/// mentions a company.
pub struct OpenLegalDataSource {
    api_url: String,
    api_key: String,
    page_size: u32,
}

impl OpenLegalDataSource {
    pub fn new(api_key: &str, api_url: Option<&str>, page_size: Option<u32>) -> Self {
        Self {
            api_url: api_url.unwrap_or(DEFAULT_API_URL).to_string(),
            api_key: api_key.to_string(),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
        }
    }

    fn read_page(body: &str) -> Option<CasePage> {
        match serde_json::from_str(body) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("OpenLegalData: unreadable response: {}", e);
                None
            }
        }
    }

    fn case_row(case: Case) -> RawRecord {
        let content = case.content.unwrap_or_default();
        let text = collapse_whitespace(&HTML_TAG.replace_all(&content, " "));
        let (court_name, jurisdiction) = case
            .court
            .map(|c| (c.name.unwrap_or_default(), c.jurisdiction.unwrap_or_default()))
            .unwrap_or_default();
        let slug = case.slug.unwrap_or_default();

        let id = match case.id {
            Some(id) => format!("DE_OLD_{id}"),
            None if !slug.is_empty() => format!("DE_OLD_{slug}"),
            None => String::new(),
        };

        RawRecord::new()
            .with("ENFORCEMENT_ID", id)
            .with("KEYWORD_SCORE", keyword_score(&content).to_string())
            .with("COMPANY", company_in_decision(&text))
            .with("SECTOR", jurisdiction)
            .with("COURT", court_name)
            .with("TYPE", case.kind.unwrap_or_default())
            .with("DATE", case.date.unwrap_or_default())
            .with("SUMMARY", truncate_chars(&text, SUMMARY_LEN))
            .with(
                "SOURCE_URL",
                if slug.is_empty() {
                    String::new()
                } else {
                    format!("{CASE_URL}{slug}")
                },
            )
    }
}

impl EnforcementSource for OpenLegalDataSource {
    fn name(&self) -> &str {
        "OpenLegalData"
    }

    fn checkpoint_key(&self) -> String {
        "openlegaldata_DE".to_string()
    }

    fn schema(&self) -> SchemaVariant {
        SchemaVariant::Canonical
    }

    fn page_request(&self, page: u32) -> PageRequest {
        let separator = if self.api_url.contains('?') { '&' } else { '?' };
        PageRequest::get(format!(
            "{}{}page={}&page_size={}",
            self.api_url,
            separator,
            page.max(1),
            self.page_size
        ))
        .header("Authorization", format!("Token {}", self.api_key))
        .header("Accept", "application/json")
    }

    fn parse_listing(&self, body: &str) -> Vec<RawRecord> {
        let Some(page) = Self::read_page(body) else {
            return Vec::new();
        };
        page.results.into_iter().map(Self::case_row).collect()
    }

    fn is_last_page(&self, body: &str) -> bool {
        Self::read_page(body).is_some_and(|page| page.next.is_none() || page.results.is_empty())
    }

    fn listing_key(&self, row: &RawRecord) -> DedupKey {
        DedupKey::new(row.get("ENFORCEMENT_ID"), "", "", "DE")
    }

    fn accepts(&self, row: &RawRecord) -> bool {
        let keep = row.get("KEYWORD_SCORE").parse::<usize>().unwrap_or(0) > 0;
        if !keep {
            debug!("  no company keywords in {}", row.get("ENFORCEMENT_ID"));
        }
        keep
    }

    fn record_key(&self, record: &EnforcementRecord) -> DedupKey {
        DedupKey::new(&record.enforcement_id, "", "", "DE")
    }

    fn normalize(&self, row: &RawRecord) -> EnforcementRecord {
        let kind = row.get("TYPE");
        EnforcementRecord {
            enforcement_id: row.get("ENFORCEMENT_ID").to_string(),
            country_code: "DE".to_string(),
            company_name: row.get("COMPANY").to_string(),
            sector: row.get("SECTOR").to_string(),
            violation_group: classify_violation(kind).label().to_string(),
            violation_type: kind.to_string(),
            enforcement_date: date_field(row.get("DATE")),
            enforcing_agency: match row.get("COURT") {
                "" => AGENCY.to_string(),
                court => court.to_string(),
            },
            summary: row.get("SUMMARY").to_string(),
            source_url: row.get("SOURCE_URL").to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "count": 2,
        "next": "https://de.openlegaldata.io/api/cases/?page=2",
        "results": [
            {"id": 101, "slug": "lg-berlin-2021-03-03-15-o-1-21",
             "court": {"name": "Landgericht Berlin", "jurisdiction": "Ordentliche Gerichtsbarkeit"},
             "date": "2021-03-03", "type": "Urteil",
             "content": "<p>Tenor</p><p>Die Klage gegen die Muster Handels GmbH wird abgewiesen.</p>"},
            {"id": 102, "slug": "bverwg-x", "court": null, "date": "2020-01-01",
             "type": "Beschluss", "content": "<p>Im Namen des Volkes</p>"}
        ]
    }"#;

    fn source() -> OpenLegalDataSource {
        OpenLegalDataSource::new("secret", None, None)
    }

    #[test]
    fn requests_carry_token_and_page_size() {
        let request = source().page_request(3);
        assert_eq!(
            request.url,
            "https://de.openlegaldata.io/api/cases/?page=3&page_size=100"
        );
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Token secret".to_string())));
    }

    #[test]
    fn company_cases_are_kept_and_normalized() {
        let source = source();
        let rows = source.parse_listing(PAGE);
        assert_eq!(rows.len(), 2);
        assert!(source.accepts(&rows[0]));
        assert!(!source.accepts(&rows[1]));

        let record = source.normalize(&rows[0]);
        assert_eq!(record.enforcement_id, "DE_OLD_101");
        assert_eq!(record.country_code, "DE");
        assert_eq!(record.company_name, "die Muster Handels GmbH");
        assert_eq!(record.sector, "Ordentliche Gerichtsbarkeit");
        assert_eq!(record.enforcing_agency, "Landgericht Berlin");
        assert_eq!(record.enforcement_date, "2021-03-03");
        assert_eq!(record.fine_amount_usd, "0");
        assert_eq!(
            record.source_url,
            "https://de.openlegaldata.io/cases/lg-berlin-2021-03-03-15-o-1-21"
        );
        assert!(record.summary.starts_with("Tenor Die Klage"));
        assert_eq!(source.normalize(&rows[1]).enforcing_agency, "OpenLegalData");
    }

    #[test]
    fn last_page_has_no_next_link() {
        assert!(!source().is_last_page(PAGE));
        assert!(source().is_last_page(r#"{"next": null, "results": []}"#));
        assert!(source().is_last_page(r#"{"next": "https://x.test/?page=9", "results": []}"#));
        assert!(!source().is_last_page("<html>error</html>"));
        assert!(source().parse_listing("<html>error</html>").is_empty());
    }

    #[test]
    fn keywords_are_weighted() {
        assert_eq!(keyword_score("Die Firma und die GmbH"), 4);
        assert_eq!(keyword_score("Im Namen des Volkes"), 0);
        assert_eq!(company_in_decision("Urteil gegen Tenor GmbH"), "");
        assert_eq!(company_in_decision("Die Acme Software AG klagt"), "Die Acme Software AG");
    }
}
