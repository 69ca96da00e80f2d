use crate::domain::RawRecord;
use crate::services::normalize::collapse_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Section headings that end a free-text value when no label follows it.
pub const DEFAULT_SECTION_BOUNDARIES: &[&str] = &[
    "HQ Country",
    "Source of Data",
    "VTG Record",
    "Data Sources",
    "Updates",
    "Menu",
    "Quick Start",
];

const PLACEHOLDERS: &[&str] = &["(click here)", "-", "n/a"];

const MAX_VALUE_LEN: usize = 1000;

#[derive(Debug, Clone)]
struct FieldRule {
    key: String,
    needle: String,
}

/// Label-based extraction of `Label: value` pairs from loosely structured
/// page text.
///
/// A value is the rest of its label's line, replaced by the span up to the
/// next occurrence of any other known label when that span is longer.
/// Without a following label it is the first non-blank line after the
/// colon, or, for the free-text field, everything up to the first section
/// boundary. Rules are applied in order and a key set by an earlier rule is
/// never overwritten.
///
/// Labels that are the tail of a longer label ("Company" inside "Current
/// Parent Company") only match where the longer label is not present.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: Vec<FieldRule>,
    free_text_key: Option<String>,
    boundaries: Vec<String>,
}

impl FieldExtractor {
    pub fn new(rules: &[(&str, &str)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(label, key)| FieldRule {
                    key: key.to_string(),
                    needle: format!("{}:", label.to_ascii_lowercase()),
                })
                .collect(),
            free_text_key: None,
            boundaries: Vec::new(),
        }
    }

    pub fn with_free_text(mut self, key: &str, boundaries: &[&str]) -> Self {
        self.free_text_key = Some(key.to_string());
        self.boundaries = boundaries.iter().map(|b| b.to_ascii_lowercase()).collect();
        self
    }

    pub fn extract(&self, text: &str) -> RawRecord {
        // ASCII folding keeps byte offsets identical to `text`.
        let lower = text.to_ascii_lowercase();
        let mut fields = RawRecord::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            if fields.contains(&rule.key) {
                continue;
            }

            let Some(start) = self.find_label(&lower, idx, 0) else {
                continue;
            };
            let value_start = start + rule.needle.len();
            let is_free_text = self.free_text_key.as_deref() == Some(rule.key.as_str());

            let value = match self.next_label(&lower, idx, value_start) {
                Some(end) => {
                    let line = collapse_whitespace(&text[value_start..line_end(text, value_start)]);
                    let span = collapse_whitespace(&text[value_start..end]);
                    if span.chars().count() > line.chars().count() {
                        span
                    } else {
                        line
                    }
                }
                None if is_free_text => {
                    let end = self.boundary(&lower, value_start).unwrap_or(text.len());
                    collapse_whitespace(&text[value_start..end])
                }
                None => collapse_whitespace(&text[value_start..first_line_end(text, value_start)]),
            };

            if value.is_empty() || is_placeholder(&value) {
                continue;
            }
            if is_free_text || value.chars().count() < MAX_VALUE_LEN {
                fields.insert(&rule.key, value);
            }
        }

        fields
    }

    /// First occurrence of rule `idx`'s label at or after `from` that is not
    /// the tail of a longer label.
    fn find_label(&self, lower: &str, idx: usize, from: usize) -> Option<usize> {
        let needle = &self.rules[idx].needle;
        let mut cursor = from;

        while let Some(offset) = lower.get(cursor..)?.find(needle.as_str()) {
            let pos = cursor + offset;
            if !self.is_shadowed(lower, idx, pos) {
                return Some(pos);
            }
            cursor = pos + needle.len();
        }
        None
    }

    fn is_shadowed(&self, lower: &str, idx: usize, pos: usize) -> bool {
        let needle = &self.rules[idx].needle;
        self.rules.iter().enumerate().any(|(other, rule)| {
            if other == idx
                || rule.needle.len() <= needle.len()
                || !rule.needle.ends_with(needle.as_str())
            {
                return false;
            }
            let lead = rule.needle.len() - needle.len();
            pos >= lead && lower.as_bytes()[pos - lead..].starts_with(rule.needle.as_bytes())
        })
    }

    fn next_label(&self, lower: &str, idx: usize, from: usize) -> Option<usize> {
        (0..self.rules.len())
            .filter(|&other| other != idx)
            .filter_map(|other| self.find_label(lower, other, from))
            .min()
    }

    fn boundary(&self, lower: &str, from: usize) -> Option<usize> {
        let rest = &lower[from..];
        self.boundaries
            .iter()
            .filter_map(|b| rest.find(b.as_str()))
            .min()
            .map(|offset| from + offset)
    }
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|offset| from + offset)
        .unwrap_or(text.len())
}

/// End of the first non-blank line starting at `from`.
fn first_line_end(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    let leading = rest.len() - rest.trim_start().len();
    line_end(text, from + leading)
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(value))
}

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static CLICK_HERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)click here").unwrap());
static ABSOLUTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://").unwrap());

/// Resolves a "source of data" link: an anchor reading "click here" first,
/// otherwise the first anchor with an absolute href.
pub fn resolve_source_link(document: &Html, base_url: &str) -> Option<String> {
    let anchors: Vec<_> = document.select(&ANCHORS).collect();

    let by_text = anchors
        .iter()
        .find(|a| CLICK_HERE.is_match(&a.text().collect::<String>()));
    let chosen = by_text.or_else(|| {
        anchors
            .iter()
            .find(|a| a.value().attr("href").is_some_and(|h| ABSOLUTE_URL.is_match(h)))
    })?;

    chosen
        .value()
        .attr("href")
        .map(|href| absolutize_url(href, base_url))
        .filter(|url| !url.is_empty())
}

/// Makes `href` absolute against `base_url` (scheme and host, no path).
pub fn absolutize_url(href: &str, base_url: &str) -> String {
    let href = href.trim();
    let base = base_url.trim_end_matches('/');
    if href.is_empty() {
        String::new()
    } else if ABSOLUTE_URL.is_match(href) {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{}", href.trim_start_matches("./"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_rules() -> FieldExtractor {
        FieldExtractor::new(&[
            ("Current Parent Company", "CURRENT_PARENT_COMPANY"),
            ("Penalty Currency", "PENALTY_CURRENCY"),
            ("Offense Category", "OFFENSE_CATEGORY"),
            ("Company", "COMPANY"),
            ("Agency", "AGENCY"),
            ("Description", "DESCRIPTION"),
        ])
        .with_free_text("DESCRIPTION", DEFAULT_SECTION_BOUNDARIES)
    }

    #[test]
    fn value_is_bounded_by_next_label() {
        let fields = tracker_rules().extract("Agency: FTC\nOffense Category: Fraud");
        assert_eq!(fields.get("AGENCY"), "FTC");
        assert_eq!(fields.get("OFFENSE_CATEGORY"), "Fraud");
    }

    #[test]
    fn whole_line_wins_over_shorter_span() {
        let fields = tracker_rules().extract("Agency: KFTC Offense Category: cartel");
        assert_eq!(fields.get("AGENCY"), "KFTC Offense Category: cartel");
        assert_eq!(fields.get("OFFENSE_CATEGORY"), "cartel");
    }

    #[test]
    fn values_are_not_compatibility_folded() {
        let fields = tracker_rules().extract("Agency: ＫＦＴＣ ²\nCompany: Acme");
        assert_eq!(fields.get("AGENCY"), "ＫＦＴＣ ²");
    }

    #[test]
    fn multi_line_values_are_joined() {
        let text = "Agency: Korea Fair\n  Trade Commission\n\nPenalty Currency: Korean Won";
        let fields = tracker_rules().extract(text);
        assert_eq!(fields.get("AGENCY"), "Korea Fair Trade Commission");
        assert_eq!(fields.get("PENALTY_CURRENCY"), "Korean Won");
    }

    #[test]
    fn labels_match_case_insensitively() {
        let fields = tracker_rules().extract("AGENCY: ACCC\nOFFENSE CATEGORY: misleading");
        assert_eq!(fields.get("AGENCY"), "ACCC");
        assert_eq!(fields.get("OFFENSE_CATEGORY"), "misleading");
    }

    #[test]
    fn shorter_label_does_not_match_inside_longer_one() {
        let text = "Current Parent Company: Samsung Group\nCompany: Samsung Electronics\nAgency: KFTC";
        let fields = tracker_rules().extract(text);
        assert_eq!(fields.get("CURRENT_PARENT_COMPANY"), "Samsung Group");
        assert_eq!(fields.get("COMPANY"), "Samsung Electronics");
    }

    #[test]
    fn last_field_takes_only_its_line() {
        let fields = tracker_rules().extract("Agency: KFTC\nFooter text\nMore footer");
        assert_eq!(fields.get("AGENCY"), "KFTC");
    }

    #[test]
    fn free_text_runs_to_section_boundary() {
        let text = "Description: The company colluded\non bids for years.\nData Sources\nMenu";
        let fields = tracker_rules().extract(text);
        assert_eq!(
            fields.get("DESCRIPTION"),
            "The company colluded on bids for years."
        );
    }

    #[test]
    fn free_text_is_not_length_capped() {
        let long = "word ".repeat(400);
        let text = format!("Description: {long}\nAgency: {}", "x".repeat(1200));
        let fields = tracker_rules().extract(&text);
        assert_eq!(fields.get("DESCRIPTION").len(), long.trim().len());
        assert!(!fields.contains("AGENCY"));
    }

    #[test]
    fn placeholders_are_rejected() {
        let fields = tracker_rules().extract("Agency: N/A\nCompany: -\nOffense Category: (click here)");
        assert!(fields.is_empty());
    }

    #[test]
    fn empty_value_does_not_swallow_next_label() {
        let fields = tracker_rules().extract("Agency:\nOffense Category: Fraud");
        assert!(!fields.contains("AGENCY"));
        assert_eq!(fields.get("OFFENSE_CATEGORY"), "Fraud");
    }

    #[test]
    fn earlier_rule_wins_for_shared_key() {
        let extractor = FieldExtractor::new(&[("Regulator", "AGENCY"), ("Agency", "AGENCY")]);
        let fields = extractor.extract("Agency: B\nRegulator: A");
        assert_eq!(fields.get("AGENCY"), "A");
    }

    #[test]
    fn source_link_prefers_click_here() {
        let html = Html::parse_document(
            r#"<a href="https://other.example/x">Home</a>
               <p>Source of Data: <a href="/docs/case.pdf">(click here)</a></p>"#,
        );
        assert_eq!(
            resolve_source_link(&html, "https://tracker.example").as_deref(),
            Some("https://tracker.example/docs/case.pdf")
        );
    }

    #[test]
    fn source_link_falls_back_to_first_absolute_href() {
        let html = Html::parse_document(
            r#"<a href="/summary">Back</a><a href="https://kftc.go.kr/case/1">Release</a>"#,
        );
        assert_eq!(
            resolve_source_link(&html, "https://tracker.example").as_deref(),
            Some("https://kftc.go.kr/case/1")
        );
        assert!(resolve_source_link(&Html::parse_document("<p>none</p>"), "https://x").is_none());
    }

    #[test]
    fn urls_are_absolutized() {
        let base = "https://tracker.example/";
        assert_eq!(absolutize_url("/a", base), "https://tracker.example/a");
        assert_eq!(absolutize_url("a/b", base), "https://tracker.example/a/b");
        assert_eq!(absolutize_url("//cdn.example/x", base), "https://cdn.example/x");
        assert_eq!(absolutize_url("http://x.example", base), "http://x.example");
        assert_eq!(absolutize_url("", base), "");
    }
}
