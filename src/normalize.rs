// 🧹 Normalizer - Consistent naming for columns and search terms
// Column names and keywords go through the same normalization so that
// substring matching compares like with like.

use serde::{Deserialize, Serialize};

/// Default search terms used when the caller supplies none.
pub const DEFAULT_KEYWORDS: &str = "revenue, client, aum, performance";

/// Normalize a column name or keyword: trim, lowercase, spaces → underscores.
///
/// Idempotent: normalizing an already-normalized name is a no-op.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

// ============================================================================
// KEYWORD SET
// ============================================================================

/// A set of normalized search terms.
///
/// Used for both column-name matching and row cell matching. An empty set
/// means "no filtering" and is a distinct state from "keywords that matched
/// nothing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet {
    terms: Vec<String>,
}

impl KeywordSet {
    /// Parse a comma-separated keyword string.
    ///
    /// Tokens are split on commas, trimmed, normalized, and empty tokens
    /// are discarded.
    pub fn parse(input: &str) -> Self {
        let terms = input
            .split(',')
            .map(normalize_name)
            .filter(|t| !t.is_empty())
            .collect();
        KeywordSet { terms }
    }

    /// Empty set - disables filtering entirely.
    pub fn none() -> Self {
        KeywordSet { terms: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// True if any keyword appears as a substring of `name`.
    /// `name` is expected to be normalized already.
    pub fn matches_name(&self, name: &str) -> bool {
        self.terms.iter().any(|t| name.contains(t.as_str()))
    }

    /// True if any keyword appears as a substring of `text`,
    /// case-insensitively.
    pub fn matches_text(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.terms.iter().any(|t| haystack.contains(t.as_str()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_basic() {
        assert_eq!(normalize_name("  Client Name "), "client_name");
        assert_eq!(normalize_name("REVENUE"), "revenue");
        assert_eq!(normalize_name("Call (x)"), "call_(x)");
    }

    #[test]
    fn test_normalize_name_idempotent() {
        let once = normalize_name("  Assets Under Management ");
        let twice = normalize_name(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_keywords() {
        let kw = KeywordSet::parse("revenue, Client Name ,, aum,");
        assert_eq!(kw.terms(), &["revenue", "client_name", "aum"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(KeywordSet::parse("").is_empty());
        assert!(KeywordSet::parse(" , , ").is_empty());
    }

    #[test]
    fn test_matches_name_substring() {
        let kw = KeywordSet::parse("rev, aum");
        assert!(kw.matches_name("total_revenue"));
        assert!(kw.matches_name("aum"));
        assert!(!kw.matches_name("performance"));
    }

    #[test]
    fn test_matches_text_case_insensitive() {
        let kw = KeywordSet::parse("acme");
        assert!(kw.matches_text("ACME Holdings"));
        assert!(!kw.matches_text("Globex"));
    }

    #[test]
    fn test_default_keywords_parse() {
        let kw = KeywordSet::parse(DEFAULT_KEYWORDS);
        assert_eq!(kw.len(), 4);
        assert!(kw.matches_name("revenue"));
        assert!(kw.matches_name("client_name"));
    }
}
