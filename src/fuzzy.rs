//! Bidirectional, case-insensitive substring matching.

/// True when either folded value contains the other.
///
/// Empty inputs never match. Because containment is checked both ways, a
/// short stored value such as `"a"` matches any query containing that
/// letter; callers rely on this loose behaviour and it is kept as is.
pub fn matches(source: &str, query: &str) -> bool {
    let source = source.trim().to_lowercase();
    let query = query.trim().to_lowercase();
    if source.is_empty() || query.is_empty() {
        return false;
    }
    source.contains(&query) || query.contains(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containment_case_insensitive() {
        assert!(matches("DataWorksheet", "data"));
        assert!(matches("data", "DataWorksheet"));
        assert!(matches("x", "x"));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!matches("", "x"));
        assert!(!matches("x", ""));
        assert!(!matches("  ", "x"));
    }

    #[test]
    fn test_disjoint() {
        assert!(!matches("Core", "Billing"));
    }

    #[test]
    fn test_short_source_matches_long_query() {
        assert!(matches("a", "anything with an a"));
    }
}
