//! Name and path normalization for client-side metadata matching.
//!
//! Both functions are total: empty input yields an empty string, and
//! applying either one twice gives the same result as applying it once.

/// Document suffixes stripped from names, longest first.
const DOCUMENT_SUFFIXES: &[&str] = &[".markdown", ".mdx", ".md"];

/// Trim, case-fold and strip trailing document suffixes from a name.
///
/// `"Foo.MD"` and `"foo"` normalize to the same value. Suffixes are removed
/// until none remains, so `"notes.md.md"` becomes `"notes"`.
pub fn normalize_name(s: &str) -> String {
    let mut name = s.trim().to_lowercase();
    while let Some(stripped) = DOCUMENT_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
    {
        name = stripped.trim_end().to_string();
    }
    name
}

/// Trim, case-fold and unify path separators to `/`.
pub fn normalize_path(s: &str) -> String {
    s.trim().replace('\\', "/").to_lowercase()
}
