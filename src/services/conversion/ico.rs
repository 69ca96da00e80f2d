use super::SchemaConverter;
use crate::domain::{EnforcementRecord, RawRecord};
use crate::services::normalize::{
    convert_currency, normalize_date_with, parse_scaled_amount, ViolationGroup, GBP_TO_USD,
};

const DATE_FORMAT: &str = "%d %B %Y";

pub struct IcoConverter;

impl SchemaConverter for IcoConverter {
    fn name(&self) -> &'static str {
        "ico"
    }

    fn convert(&self, index: usize, row: &RawRecord) -> EnforcementRecord {
        let enforcement_date = normalize_date_with(row.get("Date"), &[DATE_FORMAT])
            .parsed()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        let fine_amount_usd = parse_scaled_amount(row.get("Fine_Amount"))
            .parsed()
            .map(|amount| convert_currency(amount, GBP_TO_USD).to_string())
            .unwrap_or_else(|| "0".to_string());

        EnforcementRecord {
            enforcement_id: format!("ICO-UK-{:03}", index + 1),
            country_code: "UK".to_string(),
            company_name: row.get("Company").trim().to_string(),
            sector: row.get("Sector").trim().to_string(),
            violation_group: ViolationGroup::Privacy.label().to_string(),
            violation_type: "data_protection".to_string(),
            enforcement_date,
            fine_amount_usd,
            enforcing_agency: row.get("Authority").trim().to_string(),
            summary: String::new(),
            source_url: row.get("Source_URL").trim().to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(fine: &str, date: &str) -> RawRecord {
        RawRecord::new()
            .with("Company", "British Airways")
            .with("Sector", "Transport")
            .with("Date", date)
            .with("Fine_Amount", fine)
            .with("Authority", "Information Commissioner's Office")
            .with("Source_URL", "https://ico.org.uk/action-weve-taken/")
    }

    #[test]
    fn scaled_pound_amounts_convert_to_dollars() {
        let cases = [("£14m", "17780000"), ("£1,500", "1905"), ("£2k", "2540"), ("£290", "368")];
        for (fine, usd) in cases {
            let record = IcoConverter.convert(0, &notice(fine, "16 October 2020"));
            assert_eq!(record.fine_amount_usd, usd, "fine {fine:?}");
        }
    }

    #[test]
    fn ids_follow_row_order() {
        let record = IcoConverter.convert(6, &notice("£1", "16 October 2020"));
        assert_eq!(record.enforcement_id, "ICO-UK-007");
        assert_eq!(record.country_code, "UK");
        assert_eq!(record.violation_group, "privacy-related offenses");
        assert_eq!(record.violation_type, "data_protection");
        assert_eq!(record.enforcement_date, "2020-10-16");
        assert_eq!(record.enforcing_agency, "Information Commissioner's Office");
    }

    #[test]
    fn unparsed_dates_and_amounts_are_blanked() {
        let record = IcoConverter.convert(0, &notice("undisclosed", "Autumn 2020"));
        assert_eq!(record.enforcement_date, "");
        assert_eq!(record.fine_amount_usd, "0");
        assert_eq!(record.summary, "");
    }
}
