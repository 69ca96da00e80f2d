use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationGroup {
    Privacy,
    Competition,
    ConsumerProtection,
    Financial,
    Employment,
    Environmental,
    Other,
}

impl ViolationGroup {
    pub fn label(&self) -> &'static str {
        match self {
            ViolationGroup::Privacy => "privacy-related offenses",
            ViolationGroup::Competition => "competition-related offenses",
            ViolationGroup::ConsumerProtection => "consumer-protection-related offenses",
            ViolationGroup::Financial => "financial offenses",
            ViolationGroup::Employment => "employment-related offenses",
            ViolationGroup::Environmental => "environment-related offenses",
            ViolationGroup::Other => "other",
        }
    }
}

// Checked top to bottom; the first group with a matching keyword wins.
const KEYWORDS: &[(ViolationGroup, &[&str])] = &[
    (
        ViolationGroup::Privacy,
        &[
            "privacy",
            "data protection",
            "data_protection",
            "data breach",
            "data_breach",
            "personal data",
            "personal information",
            "security",
            "coppa",
            "gdpr",
            "dsgvo",
        ],
    ),
    (
        ViolationGroup::Competition,
        &[
            "competition",
            "antitrust",
            "cartel",
            "monopoly",
            "restraint of trade",
            "price fixing",
            "price-fixing",
            "bid-rigging",
            "bid rigging",
            "collusion",
            "conspiracy",
            "market allocation",
            "exclusive dealing",
            "merger",
        ],
    ),
    (
        ViolationGroup::ConsumerProtection,
        &[
            "consumer",
            "deceptive",
            "misleading",
            "false advertising",
            "drip pricing",
            "unfair",
            "uwg",
            "fraud",
        ],
    ),
    (
        ViolationGroup::Financial,
        &[
            "financial",
            "securities",
            "banking",
            "money laundering",
            "accounting",
            "investor",
            "tax",
        ],
    ),
    (
        ViolationGroup::Employment,
        &[
            "employment",
            "labor",
            "labour",
            "wage",
            "workplace",
            "occupational",
            "discrimination",
        ],
    ),
    (
        ViolationGroup::Environmental,
        &[
            "environment",
            "pollution",
            "emission",
            "waste",
            "wildlife",
            "climate",
        ],
    ),
];

pub fn classify_violation(text: &str) -> ViolationGroup {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(group, _)| *group)
        .unwrap_or(ViolationGroup::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_group_wins() {
        assert_eq!(
            classify_violation("Privacy and Security"),
            ViolationGroup::Privacy
        );
        // Privacy outranks consumer protection.
        assert_eq!(
            classify_violation("Consumer Protection, Privacy"),
            ViolationGroup::Privacy
        );
        assert_eq!(
            classify_violation("Price Fixing; Deceptive Practices"),
            ViolationGroup::Competition
        );
        assert_eq!(
            classify_violation("Art. 6 GDPR"),
            ViolationGroup::Privacy
        );
    }

    #[test]
    fn remaining_groups() {
        assert_eq!(
            classify_violation("False Advertising"),
            ViolationGroup::ConsumerProtection
        );
        assert_eq!(
            classify_violation("Money Laundering"),
            ViolationGroup::Financial
        );
        assert_eq!(
            classify_violation("Wage and Hour Violation"),
            ViolationGroup::Employment
        );
        assert_eq!(
            classify_violation("Environmental violation"),
            ViolationGroup::Environmental
        );
    }

    #[test]
    fn unknown_text_is_other() {
        assert_eq!(classify_violation(""), ViolationGroup::Other);
        assert_eq!(classify_violation("Warning Letter"), ViolationGroup::Other);
        assert_eq!(ViolationGroup::Other.label(), "other");
    }
}
