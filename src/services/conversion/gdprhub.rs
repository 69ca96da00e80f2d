use super::{gdpr_violation_group, SchemaConverter};
use crate::domain::{EnforcementRecord, RawRecord};
use crate::services::normalize::{convert_currency, date_field_with, truncate_chars, EUR_TO_USD};
use once_cell::sync::Lazy;
use regex::Regex;

static EUR_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([\d,.]+)\s*EUR").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,.]+").unwrap());
static ARTICLE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Cited article number to violation type, checked in order.
const ARTICLE_TYPES: &[(&str, &str)] = &[
    ("15", "access request violation"),
    ("12", "access request violation"),
    ("6", "lawful basis violation"),
    ("9", "special category data violation"),
    ("82", "damages claim"),
];

const MAX_TYPE_LEN: usize = 200;

/// Court and DPA decisions exported from GDPRhub.
pub struct GdprhubConverter {
    country: String,
}

impl GdprhubConverter {
    pub fn new(country: Option<&str>) -> Self {
        Self {
            country: country
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "DE".to_string()),
        }
    }
}

impl SchemaConverter for GdprhubConverter {
    fn name(&self) -> &'static str {
        "gdprhub"
    }

    fn convert(&self, _index: usize, row: &RawRecord) -> EnforcementRecord {
        let articles = row.get("Relevant GDPR articles").trim();
        let decision = row.get("Type of decision & outcome").trim();

        EnforcementRecord {
            enforcement_id: row.get("Case number/name").trim().to_string(),
            country_code: self.country.clone(),
            company_name: row.get("Parties").trim().to_string(),
            violation_group: gdpr_violation_group(&format!("{articles} {decision}")),
            violation_type: violation_type(articles, decision),
            enforcement_date: date_field_with(row.get("Date of decision").trim(), &["%d.%m.%Y"]),
            fine_amount_usd: fine_usd(row.get("Fine")),
            enforcing_agency: enforcing_agency(row.get("Decision by")),
            summary: row.get("Summary").trim().to_string(),
            ..Default::default()
        }
    }
}

/// Article numbers are compared whole, so "Art. 16" is not read as 6.
fn violation_type(articles: &str, decision: &str) -> String {
    if articles.is_empty() {
        return truncate_chars(decision, MAX_TYPE_LEN);
    }
    let cited: Vec<&str> = ARTICLE_NUMBER
        .find_iter(articles)
        .map(|m| m.as_str())
        .collect();
    ARTICLE_TYPES
        .iter()
        .find(|(article, _)| cited.contains(article))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| truncate_chars(articles, MAX_TYPE_LEN))
}

/// Separators are dropped outright: both "1.500" and "1,500" are 1500.
fn fine_usd(fine: &str) -> String {
    let amount = EUR_AMOUNT
        .captures(fine)
        .and_then(|caps| caps.get(1))
        .or_else(|| NUMBER.find(fine))
        .map(|m| m.as_str().replace(&[',', '.'][..], ""));

    match amount.and_then(|digits| digits.parse::<u64>().ok()) {
        Some(amount) => convert_currency(amount as f64, EUR_TO_USD).to_string(),
        None => "0".to_string(),
    }
}

fn enforcing_agency(decision_by: &str) -> String {
    let agency = decision_by.trim();
    let agency = ["Court:", "DPA:"]
        .iter()
        .find_map(|prefix| agency.strip_prefix(prefix))
        .unwrap_or(agency)
        .trim();
    PARENTHETICAL.replace_all(agency, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> RawRecord {
        RawRecord::new()
            .with("Case number/name", "1 BvR 16/13")
            .with("Parties", "Acme Versicherung AG")
            .with("Relevant GDPR articles", "Article 15 GDPR, Article 12(3) GDPR")
            .with("Type of decision & outcome", "Appeal upheld")
            .with("Date of decision", "06.11.2019")
            .with("Fine", "10.000 EUR")
            .with("Decision by", "Court: BVerfG (Federal Constitutional Court)")
            .with("Summary", "Right of access upheld.")
    }

    #[test]
    fn converts_a_court_decision() {
        let record = GdprhubConverter::new(None).convert(0, &decision());

        assert_eq!(record.enforcement_id, "1 BvR 16/13");
        assert_eq!(record.country_code, "DE");
        assert_eq!(record.violation_group, "privacy-related offenses");
        assert_eq!(record.violation_type, "access request violation");
        assert_eq!(record.enforcement_date, "2019-11-06");
        assert_eq!(record.fine_amount_usd, "10800");
        assert_eq!(record.enforcing_agency, "BVerfG");
        assert_eq!(record.source_url, "");
    }

    #[test]
    fn article_numbers_match_whole() {
        assert_eq!(violation_type("Art. 16 GDPR", ""), "Art. 16 GDPR");
        assert_eq!(violation_type("Art. 6(1)(f) GDPR", ""), "lawful basis violation");
        assert_eq!(violation_type("Art. 82 GDPR", ""), "damages claim");
        assert_eq!(violation_type("", "Claim dismissed"), "Claim dismissed");
        assert_eq!(violation_type(&"x".repeat(250), "").len(), 200);
    }

    #[test]
    fn fines_prefer_the_eur_amount() {
        assert_eq!(fine_usd("Case 12: 2,000 EUR"), "2160");
        assert_eq!(fine_usd("500"), "540");
        assert_eq!(fine_usd("none"), "0");
        assert_eq!(fine_usd(""), "0");
    }

    #[test]
    fn agency_prefixes_and_parentheticals_are_removed() {
        assert_eq!(enforcing_agency("DPA: BfDI (Germany)"), "BfDI");
        assert_eq!(enforcing_agency("LG Berlin (Regional Court) (Civil)"), "LG Berlin");
    }

    #[test]
    fn unmatched_decisions_fall_into_other() {
        let row = decision()
            .with("Relevant GDPR articles", "")
            .with("Type of decision & outcome", "Dismissed");
        let record = GdprhubConverter::new(None).convert(0, &row);
        assert_eq!(record.violation_group, "other");

        let row = row.with("Type of decision & outcome", "");
        assert_eq!(GdprhubConverter::new(None).convert(0, &row).violation_group, "");
    }

    #[test]
    fn unparsed_dates_pass_through() {
        let row = decision().with("Date of decision", "2019");
        assert_eq!(GdprhubConverter::new(Some("at")).convert(0, &row).enforcement_date, "2019");
    }
}
