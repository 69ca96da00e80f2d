use super::{gdpr_violation_group, SchemaConverter};
use crate::domain::{EnforcementRecord, RawRecord};
use crate::services::normalize::{convert_currency, date_field, EUR_TO_USD};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static ETID: Lazy<Regex> = Lazy::new(|| Regex::new(r"ETid-\d+").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s|)]+").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

const COUNTRY_CODES: &[(&str, &str)] = &[("GERMANY", "DE"), ("UNITED KINGDOM", "UK")];

/// GDPR fines exported from the CMS enforcement tracker.
///
/// The export is multi-country; with a country code set only that
/// country's rows are converted.
pub struct EnforcementTrackerConverter {
    country: Option<String>,
}

impl EnforcementTrackerConverter {
    pub fn new(country: Option<&str>) -> Self {
        Self {
            country: country
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
        }
    }
}

impl SchemaConverter for EnforcementTrackerConverter {
    fn name(&self) -> &'static str {
        "enforcement_tracker"
    }

    fn keep(&self, row: &RawRecord) -> bool {
        match &self.country {
            Some(code) => country_code(row.get("Country")) == *code,
            None => true,
        }
    }

    fn convert(&self, _index: usize, row: &RawRecord) -> EnforcementRecord {
        EnforcementRecord {
            enforcement_id: enforcement_id(row.get("ETid")),
            country_code: country_code(row.get("Country")),
            company_name: row.get("Controller/Processor").trim().to_string(),
            sector: row.first_of(&["Sector", "Column_8"]).trim().to_string(),
            violation_group: gdpr_violation_group(row.get("Quoted Art.")),
            violation_type: row.get("Type").trim().to_string(),
            enforcement_date: date_field(row.get("Date of Decision").trim()),
            fine_amount_usd: fine_usd(row.get("Fine [€]")),
            enforcing_agency: row.first_of(&["Authority", "Column_4"]).trim().to_string(),
            summary: row.first_of(&["Summary", "Column_11"]).trim().to_string(),
            source_url: collect_urls(&[row.get("Source"), row.get("Column_13"), row.get("ETid")]),
            ..Default::default()
        }
    }
}

fn enforcement_id(etid: &str) -> String {
    match ETID.find(etid) {
        Some(m) => m.as_str().to_string(),
        None => etid.split('|').next().unwrap_or_default().trim().to_string(),
    }
}

fn country_code(country: &str) -> String {
    let upper = country.trim().to_uppercase();
    if let Some((_, code)) = COUNTRY_CODES.iter().find(|(name, _)| upper.contains(name)) {
        return code.to_string();
    }
    if upper == "UK" {
        return "UK".to_string();
    }
    let prefix: String = upper.chars().take(2).collect();
    if prefix.chars().count() == 2 {
        prefix
    } else {
        String::new()
    }
}

/// Euro fines are written with thousands separators; every digit run is
/// joined before conversion.
fn fine_usd(fine: &str) -> String {
    let digits: String = DIGITS.find_iter(fine).map(|m| m.as_str()).collect();
    match digits.parse::<u64>() {
        Ok(amount) => convert_currency(amount as f64, EUR_TO_USD).to_string(),
        Err(_) => "0".to_string(),
    }
}

fn collect_urls(texts: &[&str]) -> String {
    let urls: BTreeSet<&str> = texts
        .iter()
        .flat_map(|text| URL.find_iter(text).map(|m| m.as_str()))
        .collect();
    urls.into_iter().collect::<Vec<_>>().join("; ")
}
