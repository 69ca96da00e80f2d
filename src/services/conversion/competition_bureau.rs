use super::SchemaConverter;
use crate::domain::{EnforcementRecord, RawRecord};
use crate::services::normalize::{
    amount_field, date_field, extract_company_from_text, truncate_chars, ViolationGroup,
};

const MAX_NAME_LEN: usize = 100;
const MAX_TYPE_LEN: usize = 200;
const MAX_SUMMARY_LEN: usize = 500;

/// Keywords a long violation description is reduced to, checked in order.
const TYPE_KEYWORDS: &[&str] = &[
    "drip pricing",
    "bid-rigging",
    "conspiracy",
    "misleading",
    "deceptive",
    "false advertising",
    "anti-competitive",
    "cartel",
];

/// Competition Bureau Canada case exports, already close to the schema
/// but with prose in the name and type columns.
pub struct CompetitionBureauConverter;

impl SchemaConverter for CompetitionBureauConverter {
    fn name(&self) -> &'static str {
        "competition_bureau"
    }

    fn convert(&self, _index: usize, row: &RawRecord) -> EnforcementRecord {
        let violation_type = clean_violation_type(row.get("violation_type"));
        let violation_group = if row.get("regulation_name").trim().is_empty() {
            String::new()
        } else {
            ViolationGroup::Competition.label().to_string()
        };

        let country_code = match row.get("country_code").trim() {
            "" => "CA".to_string(),
            code => code.to_string(),
        };

        EnforcementRecord {
            enforcement_id: row.get("enforcement_id").trim().to_string(),
            country_code,
            company_name: company_name(row),
            sector: row.get("sector").trim().to_string(),
            violation_group,
            summary: summary(row, &violation_type),
            violation_type,
            enforcement_date: date_field(
                row.first_of(&["enforcement_date", "violation_date"]).trim(),
            ),
            fine_amount_usd: amount_field(row.get("fine_amount_usd")),
            enforcing_agency: row.get("enforcing_agency").trim().to_string(),
            source_url: row.get("source_url").trim().to_string(),
            ..Default::default()
        }
    }
}

/// The name column often holds the sector or a whole sentence; the case
/// title ("Company - Sector") is the better source then.
fn company_name(row: &RawRecord) -> String {
    let mut name = row.get("company_name").trim().to_string();
    let sector = row.get("sector").trim();
    let case_name = row.get("case_name").trim();

    let unusable = name.is_empty() || name == sector || name.chars().count() > MAX_NAME_LEN;
    if unusable && !case_name.is_empty() {
        name = match case_name.split_once(" - ") {
            Some((head, _)) if head.trim().chars().count() <= MAX_NAME_LEN => {
                head.trim().to_string()
            }
            Some((head, _)) => extract_company_from_text(head),
            None => extract_company_from_text(case_name),
        };
    }

    if name.chars().count() > MAX_NAME_LEN {
        name = extract_company_from_text(&name);
    }
    name
}

fn clean_violation_type(value: &str) -> String {
    let value = value.trim();
    if value.chars().count() <= MAX_TYPE_LEN {
        return value.to_string();
    }
    let lower = value.to_lowercase();
    match TYPE_KEYWORDS.iter().find(|k| lower.contains(*k)) {
        Some(keyword) => title_case(&keyword.replace('-', " ")),
        None => format!("{}...", truncate_chars(value, 100)),
    }
}

fn summary(row: &RawRecord, violation_type: &str) -> String {
    let summary = row.get("summary").trim();
    if !summary.is_empty() {
        return truncate_chars(summary, MAX_SUMMARY_LEN);
    }
    let settlement = row.get("settlement_type").trim();
    if settlement.chars().count() > 10 {
        truncate_chars(settlement, MAX_SUMMARY_LEN)
    } else {
        truncate_chars(violation_type, MAX_SUMMARY_LEN)
    }
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
