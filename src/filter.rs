//! Exact-match metadata filters understood by the remote index.
//!
//! The index only supports equality on metadata fields, so the filter built
//! here deliberately matches less than the fuzzy client-side rules applied by
//! [`crate::query`]. The query engine compensates by re-filtering locally.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::models::{keys, QueryChunksRequest};

/// Conjunction of `field == value` clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    clauses: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: &str) -> Self {
        self.clauses.insert(field.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> impl Iterator<Item = (&str, &str)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every clause equals the corresponding metadata string.
    pub fn accepts(&self, metadata: &Map<String, Value>) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| metadata.get(field).and_then(Value::as_str) == Some(value.as_str()))
    }

    /// Wire form: `{"module": {"$eq": "Core"}, ...}`.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .clauses
            .iter()
            .map(|(field, value)| (field.clone(), json!({ "$eq": value })))
            .collect();
        Value::Object(map)
    }
}

/// Build the remote filter for a request.
///
/// Returns `None` unless `metadataFilter` is set and at least one of
/// `module`, `name`, `path` is present.
pub fn build(request: &QueryChunksRequest) -> Option<MetadataFilter> {
    if !request.metadata_filter {
        return None;
    }

    let mut filter = MetadataFilter::new();
    if let Some(module) = request.module() {
        filter = filter.eq(keys::MODULE, module);
    }
    if let Some(name) = request.name() {
        filter = filter.eq(keys::NAME, name);
    }
    if let Some(path) = request.path() {
        filter = filter.eq(keys::PATH, path);
    }

    if filter.is_empty() {
        None
    } else {
        Some(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(module: Option<&str>, name: Option<&str>, flag: bool) -> QueryChunksRequest {
        QueryChunksRequest {
            module: module.map(String::from),
            name: name.map(String::from),
            metadata_filter: flag,
            ..Default::default()
        }
    }

    #[test]
    fn test_flag_off_yields_no_filter() {
        assert_eq!(build(&request(Some("Core"), Some("a.md"), false)), None);
    }

    #[test]
    fn test_no_fields_yields_no_filter() {
        assert_eq!(build(&request(None, None, true)), None);
    }

    #[test]
    fn test_clauses_for_present_fields() {
        let filter = build(&request(Some("Core"), Some("a.md"), true)).unwrap();
        assert_eq!(
            filter.to_json(),
            json!({"module": {"$eq": "Core"}, "name": {"$eq": "a.md"}})
        );
    }

    #[test]
    fn test_values_are_exact() {
        let mut req = request(None, None, true);
        req.path = Some("Docs\\A.md".into());
        let filter = build(&req).unwrap();
        assert_eq!(filter.to_json(), json!({"path": {"$eq": "Docs\\A.md"}}));
    }

    #[test]
    fn test_accepts() {
        let filter = MetadataFilter::new().eq("module", "Core");
        let hit = json!({"module": "Core", "name": "x"});
        let miss = json!({"module": "core"});
        assert!(filter.accepts(hit.as_object().unwrap()));
        assert!(!filter.accepts(miss.as_object().unwrap()));
        assert!(MetadataFilter::new().accepts(&Map::new()));
    }
}
