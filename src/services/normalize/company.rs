use once_cell::sync::Lazy;
use regex::Regex;

static LEGAL_SUFFIX_ANCHORED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^([A-Z][A-Za-z0-9\s&,.\-]+?(?:\bLtd\.|\bInc\.|\bCorp\.|\bLimited\b|\bCompany\b|\bLtée|\bGmbH\b|\bAG\b|\bLLC\b|\bplc\b))",
    )
    .unwrap()
});

static LEGAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)([A-Z][A-Za-z0-9\s&,.\-]+?(?:\bLtd\.|\bInc\.|\bCorp\.|\bLimited\b|\bCompany\b|\bLtée|\bGmbH\b|\bAG\b|\bLLC\b|\bplc\b))",
    )
    .unwrap()
});

static TRAILING_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:has been|will pay).*$").unwrap());

static NAME_BEFORE_ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^([A-Z][A-Za-z0-9\s&,.\-]{2,40}?)\s+(?:will pay|pleaded|has been ordered|has been|was ordered)",
    )
    .unwrap()
});

static PERSON_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][a-z]+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)").unwrap());

/// Pulls a company or person name out of a free-text case title.
///
/// Strategies, first acceptable match wins: a name ending in a legal
/// suffix; the words before an action verb ("will pay", "pleaded", ...);
/// a two or three word capitalized person name; the first three words when
/// the text starts with a capital; the first 40 characters.
pub fn extract_company_from_text(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() || text.to_lowercase().starts_with("criminal charges") {
        return String::new();
    }

    for pattern in [&*LEGAL_SUFFIX_ANCHORED, &*LEGAL_SUFFIX] {
        if let Some(caps) = pattern.captures(text) {
            let name = TRAILING_ACTION.replace(caps[1].trim(), "").trim().to_string();
            if (2..=80).contains(&name.chars().count()) {
                return name;
            }
        }
    }

    if let Some(caps) = NAME_BEFORE_ACTION.captures(text) {
        let mut name = caps[1].trim().to_string();
        if name.contains(',') && name.chars().count() > 30 {
            name = name.split(',').next().unwrap_or_default().trim().to_string();
        }
        if (2..=50).contains(&name.chars().count()) {
            return name;
        }
    }

    if let Some(caps) = PERSON_NAME.captures(text) {
        let name = caps[1].trim();
        if (3..=50).contains(&name.chars().count()) {
            return name.to_string();
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words
        .first()
        .and_then(|w| w.chars().next())
        .is_some_and(char::is_uppercase)
    {
        let leading = words.iter().take(3).copied().collect::<Vec<_>>().join(" ");
        if leading.chars().count() <= 40 {
            return leading;
        }
    }

    super::truncate_chars(text, 40).trim().to_string()
}
