use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagPair {
    pub tag_name: String,
    pub tag_value: String,
}

/// Tags attached to one catalog object, kept sorted by name then value so
/// the serialized form is stable across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TagSet(Vec<TagPair>);

impl TagSet {
    pub fn new(mut pairs: Vec<TagPair>) -> Self {
        pairs.sort_by(|a, b| {
            a.tag_name
                .cmp(&b.tag_name)
                .then_with(|| a.tag_value.cmp(&b.tag_value))
        });
        pairs.dedup();
        Self(pairs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[TagPair] {
        &self.0
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// Point-in-time view of the tag catalog, keyed by object name. Objects
/// without catalog entries resolve to an empty set.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    by_object: HashMap<String, TagSet>,
}

impl TagCatalog {
    pub fn from_rows(rows: Vec<(String, TagPair)>) -> Self {
        let mut grouped: HashMap<String, Vec<TagPair>> = HashMap::new();
        for (object, pair) in rows {
            grouped.entry(object).or_default().push(pair);
        }
        let by_object = grouped
            .into_iter()
            .map(|(object, pairs)| (object, TagSet::new(pairs)))
            .collect();
        Self { by_object }
    }

    pub fn lookup(&self, object: &str) -> TagSet {
        self.by_object.get(object).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_object.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, value: &str) -> TagPair {
        TagPair {
            tag_name: name.to_string(),
            tag_value: value.to_string(),
        }
    }

    #[test]
    fn tag_set_sorts_and_dedups() {
        let set = TagSet::new(vec![
            pair("team", "data"),
            pair("cost_center", "cc-17"),
            pair("team", "data"),
        ]);
        assert_eq!(
            set.pairs(),
            &[pair("cost_center", "cc-17"), pair("team", "data")]
        );
    }

    #[test]
    fn empty_set_serializes_as_empty_array() {
        assert_eq!(TagSet::default().to_json(), "[]");
        assert_eq!(TagSet::from_json("[]"), TagSet::default());
        assert_eq!(TagSet::from_json("not json"), TagSet::default());
    }

    #[test]
    fn json_round_trip() {
        let set = TagSet::new(vec![pair("env", "prod")]);
        let raw = set.to_json();
        assert_eq!(raw, r#"[{"tag_name":"env","tag_value":"prod"}]"#);
        assert_eq!(TagSet::from_json(&raw), set);
    }

    #[test]
    fn catalog_lookup_defaults_to_empty() {
        let catalog = TagCatalog::from_rows(vec![
            ("ETL_WH".to_string(), pair("team", "data")),
            ("ETL_WH".to_string(), pair("env", "prod")),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.lookup("ETL_WH").pairs(),
            &[pair("env", "prod"), pair("team", "data")]
        );
        assert!(catalog.lookup("UNTAGGED_WH").is_empty());
    }
}
