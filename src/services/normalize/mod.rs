//! Total field-level normalizers shared by every source and converter.

mod classify;
mod company;

pub use classify::{classify_violation, ViolationGroup};
pub use company::extract_company_from_text;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Parsed(T),
    Passthrough(String),
}

impl<T> Normalized<T> {
    pub fn parsed(self) -> Option<T> {
        match self {
            Normalized::Parsed(value) => Some(value),
            Normalized::Passthrough(_) => None,
        }
    }
}

pub const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d %B %Y",
    "%Y.%m.%d",
    "%Y-%m-%d %H:%M:%S",
];

const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Keeps digits and dots, parses as a float and truncates.
pub fn extract_amount(value: &str) -> Normalized<u64> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount < u64::MAX as f64 => {
            Normalized::Parsed(amount.trunc() as u64)
        }
        _ => Normalized::Passthrough(value.to_string()),
    }
}

/// [`extract_amount`] as a schema value: "0" when nothing parses.
pub fn amount_field(value: &str) -> String {
    extract_amount(value)
        .parsed()
        .map(|amount| amount.to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// Digits of `value` concatenated, or "0" when there are none.
pub fn digits_field(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        "0".to_string()
    } else {
        digits
    }
}

static SCALED_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([0-9][0-9,]*(?:\.[0-9]+)?)\s*(billion|bn|million|m|thousand|k)?$").unwrap()
});

/// Parses amounts written with a magnitude suffix ("14m", "1.5 million",
/// "2k") after dropping currency symbols and surrounding whitespace.
pub fn parse_scaled_amount(value: &str) -> Normalized<f64> {
    let cleaned: String = value
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .trim()
        .to_string();

    let Some(caps) = SCALED_AMOUNT.captures(&cleaned) else {
        return Normalized::Passthrough(value.to_string());
    };

    let Ok(base) = caps[1].replace(',', "").parse::<f64>() else {
        return Normalized::Passthrough(value.to_string());
    };

    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(s) if s == "billion" || s == "bn" => 1_000_000_000.0,
        Some(s) if s == "million" || s == "m" => 1_000_000.0,
        Some(s) if s == "thousand" || s == "k" => 1_000.0,
        _ => 1.0,
    };

    Normalized::Parsed(base * multiplier)
}

/// Applies a fixed exchange rate and truncates to whole units.
///
/// Rates are static approximations, not live quotes.
pub fn convert_currency(amount: f64, rate: f64) -> u64 {
    let converted = amount * rate;
    if converted.is_finite() && converted > 0.0 && converted < u64::MAX as f64 {
        converted.trunc() as u64
    } else {
        0
    }
}

pub const GBP_TO_USD: f64 = 1.27;
pub const EUR_TO_USD: f64 = 1.08;

/// Currency names to ISO codes; specific names precede the generic ones
/// they contain ("singapore dollar" before "dollar").
const CURRENCY_NAMES: &[(&str, &str)] = &[
    ("south korean won", "KRW"),
    ("korean won", "KRW"),
    ("won", "KRW"),
    ("singapore dollar", "SGD"),
    ("canadian dollar", "CAD"),
    ("australian dollar", "AUD"),
    ("us dollar", "USD"),
    ("dollar", "USD"),
    ("usd", "USD"),
    ("british pound", "GBP"),
    ("pound", "GBP"),
    ("gbp", "GBP"),
    ("euro", "EUR"),
    ("eur", "EUR"),
    ("sgd", "SGD"),
    ("cad", "CAD"),
    ("aud", "AUD"),
];

/// Maps a currency name to its code by case-insensitive substring match.
/// Unmatched input is returned unchanged.
pub fn currency_code(currency: &str) -> String {
    let lower = currency.to_lowercase();
    CURRENCY_NAMES
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| currency.to_string())
}

pub fn normalize_date(value: &str) -> Normalized<NaiveDate> {
    normalize_date_with(value, DATE_FORMATS)
}

pub fn normalize_date_with(value: &str, formats: &[&str]) -> Normalized<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Normalized::Passthrough(value.to_string());
    }

    for format in formats {
        let parsed = if format.contains("%H") {
            NaiveDateTime::parse_from_str(trimmed, format).map(|dt| dt.date())
        } else {
            NaiveDate::parse_from_str(trimmed, format)
        };
        if let Ok(date) = parsed {
            return Normalized::Parsed(date);
        }
    }

    Normalized::Passthrough(value.to_string())
}

/// [`normalize_date`] as a schema value: `YYYY-MM-DD`, or the input
/// unchanged when no format matches.
pub fn date_field(value: &str) -> String {
    format_date(normalize_date(value))
}

pub fn date_field_with(value: &str, formats: &[&str]) -> String {
    format_date(normalize_date_with(value, formats))
}

fn format_date(date: Normalized<NaiveDate>) -> String {
    match date {
        Normalized::Parsed(date) => date.format(OUTPUT_DATE_FORMAT).to_string(),
        Normalized::Passthrough(original) => original,
    }
}

pub fn year_of(date: &str) -> &str {
    match date.get(..4) {
        Some(year) if year.chars().all(|c| c.is_ascii_digit()) => year,
        _ => "",
    }
}

pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_without_digits_become_zero() {
        for input in ["", "-", "N/A", "$", "unknown", "..", "(click here)"] {
            assert_eq!(amount_field(input), "0", "input {input:?}");
            assert!(matches!(extract_amount(input), Normalized::Passthrough(_)));
        }
    }

    #[test]
    fn amounts_drop_symbols_and_truncate() {
        assert_eq!(amount_field("$1,250,000"), "1250000");
        assert_eq!(amount_field("USD 99.99"), "99");
        assert_eq!(amount_field(" 42 "), "42");
        // Dotted thousands separators are not a number.
        assert_eq!(amount_field("1.250.000"), "0");
    }

    #[test]
    fn amounts_beyond_range_are_not_saturated() {
        assert_eq!(amount_field(&"9".repeat(30)), "0");
        assert_eq!(amount_field("-5"), "5");
        assert_eq!(convert_currency(1e30, EUR_TO_USD), 0);
        assert_eq!(convert_currency(-100.0, EUR_TO_USD), 0);
    }

    #[test]
    fn digits_field_keeps_only_digits() {
        assert_eq!(digits_field("KRW 1,300,000,000"), "1300000000");
        assert_eq!(digits_field("none"), "0");
    }

    #[test]
    fn scaled_amounts() {
        assert_eq!(parse_scaled_amount("£14m"), Normalized::Parsed(14_000_000.0));
        assert_eq!(parse_scaled_amount("£1,500 "), Normalized::Parsed(1_500.0));
        assert_eq!(parse_scaled_amount("2k"), Normalized::Parsed(2_000.0));
        assert_eq!(
            parse_scaled_amount("$1.5 million"),
            Normalized::Parsed(1_500_000.0)
        );
        assert!(matches!(parse_scaled_amount("£"), Normalized::Passthrough(_)));
        assert!(matches!(parse_scaled_amount("about 5 pounds"), Normalized::Passthrough(_)));
    }

    #[test]
    fn currency_conversion_truncates() {
        assert_eq!(convert_currency(14_000_000.0, GBP_TO_USD), 17_780_000);
        assert_eq!(convert_currency(290.0, GBP_TO_USD), 368);
        assert_eq!(convert_currency(1_000.0, EUR_TO_USD), 1_080);
        assert_eq!(convert_currency(f64::NAN, EUR_TO_USD), 0);
    }

    #[test]
    fn currency_names_map_to_codes() {
        assert_eq!(currency_code("South Korean Won"), "KRW");
        assert_eq!(currency_code("Euro"), "EUR");
        assert_eq!(currency_code("British Pound Sterling"), "GBP");
        assert_eq!(currency_code("US Dollar"), "USD");
        assert_eq!(currency_code("Singapore Dollar"), "SGD");
        assert_eq!(currency_code("JPY"), "JPY");
        assert_eq!(currency_code(""), "");
    }

    #[test]
    fn dates_in_known_formats_are_reformatted() {
        assert_eq!(date_field("March 3, 2021"), "2021-03-03");
        assert_eq!(date_field("2021/03/03"), "2021-03-03");
        assert_eq!(date_field("03.03.2021"), "2021-03-03");
        assert_eq!(date_field("2 December 2025"), "2025-12-02");
        assert_eq!(date_field("2021-03-03 10:15:00"), "2021-03-03");
        assert_eq!(date_field("2021.3.3"), "2021-03-03");
    }

    #[test]
    fn date_normalization_is_total() {
        for input in ["", "   ", "soon", "2021-13-45", "March 2021", "日付"] {
            let out = date_field(input);
            assert_eq!(out, input, "unparsed input must pass through");
            assert!(matches!(normalize_date(input), Normalized::Passthrough(_)));
        }
    }

    #[test]
    fn year_fragment() {
        assert_eq!(year_of("2021-03-03"), "2021");
        assert_eq!(year_of("March"), "");
        assert_eq!(year_of(""), "");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
