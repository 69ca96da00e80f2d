use super::SchemaConverter;
use crate::domain::{EnforcementRecord, RawRecord};
use crate::services::normalize::{classify_violation, ViolationGroup};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// FTC exports that already use the schema's column names but carry
/// dotted dates and float amounts.
pub struct FtcExportConverter;

impl SchemaConverter for FtcExportConverter {
    fn name(&self) -> &'static str {
        "ftc"
    }

    fn convert(&self, _index: usize, row: &RawRecord) -> EnforcementRecord {
        let text = |key: &str| row.get(key).trim().to_string();

        EnforcementRecord {
            enforcement_id: text("enforcement_id"),
            country_code: text("country_code"),
            company_name: text("company_name"),
            sector: text("sector"),
            violation_group: violation_group(row.get("violation_type")).label().to_string(),
            violation_type: text("violation_type"),
            enforcement_date: format_date(row.get("enforcement_date")),
            fine_amount_usd: format_amount(row.get("fine_amount_usd")),
            enforcing_agency: text("enforcing_agency"),
            summary: text("summary"),
            source_url: text("source_url"),
            ..Default::default()
        }
    }
}

/// Everything the FTC handles that is neither privacy nor competition is
/// consumer protection.
fn violation_group(violation_type: &str) -> ViolationGroup {
    match classify_violation(violation_type) {
        group @ (ViolationGroup::Privacy | ViolationGroup::Competition) => group,
        _ => ViolationGroup::ConsumerProtection,
    }
}

/// `YYYY.M.D` to `YYYY-MM-DD`; a missing day becomes the first of the month.
fn format_date(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() || ISO_DATE.is_match(value) || !value.contains('.') {
        return value.to_string();
    }

    let parts: Vec<&str> = value.split('.').collect();
    match parts.as_slice() {
        [year, month, day] => {
            let day = if day.is_empty() { "1" } else { day };
            format!("{year}-{month:0>2}-{day:0>2}")
        }
        _ => String::new(),
    }
}

/// Whole dollars; negative, unparsable or out-of-range amounts become "0".
fn format_amount(value: &str) -> String {
    match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 && amount < u64::MAX as f64 => {
            (amount.trunc() as u64).to_string()
        }
        _ => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_dates_are_zero_padded() {
        assert_eq!(format_date("2023.5.7"), "2023-05-07");
        assert_eq!(format_date("2023.11."), "2023-11-01");
        assert_eq!(format_date("2023-05-07"), "2023-05-07");
        assert_eq!(format_date("2023.5"), "");
        assert_eq!(format_date("May 2023"), "May 2023");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn float_amounts_become_integers() {
        assert_eq!(format_amount("1500000.0"), "1500000");
        assert_eq!(format_amount(" 2.5e6 "), "2500000");
        assert_eq!(format_amount("unknown"), "0");
        assert_eq!(format_amount(""), "0");
        assert_eq!(format_amount("-5"), "0");
        assert_eq!(format_amount("1e40"), "0");
    }

    #[test]
    fn groups_default_to_consumer_protection() {
        assert_eq!(violation_group(""), ViolationGroup::ConsumerProtection);
        assert_eq!(violation_group("Data Security"), ViolationGroup::Privacy);
        assert_eq!(violation_group("Monopoly; Mergers"), ViolationGroup::Competition);
        assert_eq!(
            violation_group("Tobacco; Advertising"),
            ViolationGroup::ConsumerProtection
        );
        assert_eq!(
            violation_group("Financial Technology"),
            ViolationGroup::ConsumerProtection
        );
    }

    #[test]
    fn converts_an_exported_case() {
        let row = RawRecord::new()
            .with("enforcement_id", " US_FTC_X230041 ")
            .with("country_code", "US")
            .with("company_name", "Acme Apps")
            .with("violation_type", "Children's Privacy")
            .with("enforcement_date", "2024.1.9")
            .with("fine_amount_usd", "20000000.0")
            .with("enforcing_agency", "Federal Trade Commission");

        let record = FtcExportConverter.convert(0, &row);
        assert_eq!(record.enforcement_id, "US_FTC_X230041");
        assert_eq!(record.violation_group, "privacy-related offenses");
        assert_eq!(record.enforcement_date, "2024-01-09");
        assert_eq!(record.fine_amount_usd, "20000000");
    }
}
