//! Compiled match-rule predicates.
//!
//! Rule values are normalized the same way as inbound text (trimmed,
//! lowercased) so matching is case-insensitive on both sides.

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};

/// Upper bound on compiled regex size for dashboard-supplied patterns.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Normalize inbound text for matching: trim surrounding whitespace and
/// lowercase.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A ready-to-evaluate match rule predicate.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Normalized text equals one of the members.
    Exact(BTreeSet<String>),
    /// Normalized text contains one of the members.
    Contains(Vec<String>),
    /// Case-insensitive search anywhere in the normalized text.
    Regex(Regex),
    Any,
}

impl Matcher {
    pub fn exact<'a>(values: impl IntoIterator<Item = &'a String>) -> Self {
        Self::Exact(values.into_iter().map(|v| normalize(v)).collect())
    }

    pub fn contains<'a>(values: impl IntoIterator<Item = &'a String>) -> Self {
        Self::Contains(values.into_iter().map(|v| normalize(v)).collect())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map(Self::Regex)
    }

    /// Evaluate against text already passed through [`normalize`].
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Self::Exact(set) => set.contains(normalized),
            Self::Contains(needles) => needles.iter().any(|n| normalized.contains(n.as_str())),
            Self::Regex(re) => re.is_match(normalized),
            Self::Any => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  OlÁ \n"), "olá");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn exact_is_whole_string() {
        let m = Matcher::exact(&strings(&["Oi", " start "]));
        assert!(m.matches("oi"));
        assert!(m.matches("start"));
        assert!(!m.matches("oi tudo bem"));
    }

    #[test]
    fn contains_is_substring() {
        let m = Matcher::contains(&strings(&["Mentoria", "1"]));
        assert!(m.matches("quero mentoria"));
        assert!(m.matches("opção 1"));
        assert!(!m.matches("produto"));
    }

    #[test]
    fn regex_ignores_case_and_searches_anywhere() {
        let m = Matcher::regex(r"(^|\s)(997|497|2000)(\s|$)").unwrap();
        assert!(m.matches("ticket 997 sim"));
        assert!(!m.matches("9970"));

        let upper = Matcher::regex("HUMANO").unwrap();
        assert!(upper.matches("quero um humano"));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        assert!(Matcher::regex("(unclosed").is_err());
    }

    #[test]
    fn empty_text_only_hits_empty_compatible_rules() {
        assert!(Matcher::exact(&strings(&[""])).matches(""));
        assert!(Matcher::regex("^$").unwrap().matches(""));
        assert!(Matcher::Any.matches(""));
        assert!(!Matcher::contains(&strings(&["oi"])).matches(""));
    }
}
