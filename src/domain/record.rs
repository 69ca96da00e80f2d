use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column layout of an output file. Column order is part of the contract:
/// downstream merges concatenate files positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVariant {
    #[default]
    Canonical,
    WithOriginalCurrency,
}

impl SchemaVariant {
    const CANONICAL: [&'static str; 11] = [
        "enforcement_id",
        "country_code",
        "company_name",
        "sector",
        "violation_group",
        "violation_type",
        "enforcement_date",
        "fine_amount_usd",
        "enforcing_agency",
        "summary",
        "source_url",
    ];

    const WITH_ORIGINAL_CURRENCY: [&'static str; 13] = [
        "enforcement_id",
        "country_code",
        "company_name",
        "sector",
        "violation_group",
        "violation_type",
        "enforcement_date",
        "fine_amount_usd",
        "fine_amount_original",
        "currency",
        "enforcing_agency",
        "summary",
        "source_url",
    ];

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            SchemaVariant::Canonical => &Self::CANONICAL,
            SchemaVariant::WithOriginalCurrency => &Self::WITH_ORIGINAL_CURRENCY,
        }
    }
}

/// One enforcement action in the common schema.
///
/// Every field is a string and defaults to empty so that files from
/// different sources stay union-compatible. `fine_amount_usd` is "0"
/// when the amount is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementRecord {
    pub enforcement_id: String,
    pub country_code: String,
    pub company_name: String,
    pub sector: String,
    pub violation_group: String,
    pub violation_type: String,
    pub enforcement_date: String,
    pub fine_amount_usd: String,
    pub fine_amount_original: String,
    pub currency: String,
    pub enforcing_agency: String,
    pub summary: String,
    pub source_url: String,
}

impl Default for EnforcementRecord {
    fn default() -> Self {
        Self {
            enforcement_id: String::new(),
            country_code: String::new(),
            company_name: String::new(),
            sector: String::new(),
            violation_group: String::new(),
            violation_type: String::new(),
            enforcement_date: String::new(),
            fine_amount_usd: "0".to_string(),
            fine_amount_original: String::new(),
            currency: String::new(),
            enforcing_agency: String::new(),
            summary: String::new(),
            source_url: String::new(),
        }
    }
}

impl EnforcementRecord {
    pub fn field(&self, column: &str) -> &str {
        match column {
            "enforcement_id" => &self.enforcement_id,
            "country_code" => &self.country_code,
            "company_name" => &self.company_name,
            "sector" => &self.sector,
            "violation_group" => &self.violation_group,
            "violation_type" => &self.violation_type,
            "enforcement_date" => &self.enforcement_date,
            "fine_amount_usd" => &self.fine_amount_usd,
            "fine_amount_original" => &self.fine_amount_original,
            "currency" => &self.currency,
            "enforcing_agency" => &self.enforcing_agency,
            "summary" => &self.summary,
            "source_url" => &self.source_url,
            _ => "",
        }
    }

    pub fn to_row(&self, variant: SchemaVariant) -> Vec<&str> {
        variant.columns().iter().map(|c| self.field(c)).collect()
    }

    /// Builds a record from a header-addressed row. Unknown columns are
    /// ignored, missing ones keep their defaults.
    pub fn from_row(headers: &[String], values: &[String]) -> Self {
        let mut record = Self::default();
        for (header, value) in headers.iter().zip(values) {
            let slot = match header.as_str() {
                "enforcement_id" => &mut record.enforcement_id,
                "country_code" => &mut record.country_code,
                "company_name" => &mut record.company_name,
                "sector" => &mut record.sector,
                "violation_group" => &mut record.violation_group,
                "violation_type" => &mut record.violation_type,
                "enforcement_date" => &mut record.enforcement_date,
                "fine_amount_usd" => &mut record.fine_amount_usd,
                "fine_amount_original" => &mut record.fine_amount_original,
                "currency" => &mut record.currency,
                "enforcing_agency" => &mut record.enforcing_agency,
                "summary" => &mut record.summary,
                "source_url" => &mut record.source_url,
                _ => continue,
            };
            *slot = value.clone();
        }
        record
    }
}

/// Source-specific field name to raw text, as scraped from one listing row
/// or one detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord(BTreeMap<String, String>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_empty())
    }

    /// First non-empty value among `keys`, or "".
    pub fn first_of(&self, keys: &[&str]) -> &str {
        keys.iter()
            .map(|k| self.get(k))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }

    /// Overlays `other` onto this record; values from `other` win.
    pub fn merge(&mut self, other: RawRecord) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identity of an enforcement action within one collection run.
///
/// Equality is exact on the trimmed strings: differing case or inner
/// whitespace produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub company: String,
    pub period: String,
    pub amount: String,
    pub jurisdiction: String,
}

impl DedupKey {
    pub fn new(company: &str, period: &str, amount: &str, jurisdiction: &str) -> Self {
        Self {
            company: company.trim().to_string(),
            period: period.trim().to_string(),
            amount: amount.trim().to_string(),
            jurisdiction: jurisdiction.trim().to_string(),
        }
    }
}
