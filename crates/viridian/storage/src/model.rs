use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One `(key, value)` pair returned by a selector query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// Proof of a committed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub tx_id: String,
    /// Ledger height after this commit.
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    pub written_keys: Vec<String>,
    /// Hash of the commit record, linked to the previous one. Empty for read-only commits.
    pub hash: String,
}

/// One historical value of a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyModification {
    pub tx_id: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub value: Vec<u8>,
}

/// Attribute selector in rich-query form: `{"selector": {field: value, ...}}`.
///
/// Only equality on top-level fields is expressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub selector: BTreeMap<String, Value>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.selector.insert(field.into(), value.into());
        self
    }

    /// Rendering handed to the query engine.
    pub fn to_query_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"selector\":{}}"))
    }

    /// Whether a decoded document satisfies every criterion.
    pub fn matches(&self, document: &Value) -> bool {
        let Some(object) = document.as_object() else {
            return false;
        };
        self.selector
            .iter()
            .all(|(field, expected)| object.get(field) == Some(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_renders_rich_query_shape() {
        let selector = Selector::new()
            .field_eq("docType", "product")
            .field_eq("gtin", "7612100055557");
        assert_eq!(
            selector.to_query_string(),
            r#"{"selector":{"docType":"product","gtin":"7612100055557"}}"#
        );
    }

    #[test]
    fn selector_values_are_json_encoded() {
        let selector = Selector::new().field_eq("gtin", "1\", \"docType\": \"label");
        let rendered: Value = serde_json::from_str(&selector.to_query_string()).unwrap();
        assert_eq!(rendered["selector"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn selector_matches_top_level_equality() {
        let selector = Selector::new().field_eq("docType", "product").field_eq("gtin", "42");
        assert!(selector.matches(&serde_json::json!({"docType": "product", "gtin": "42", "x": 1})));
        assert!(!selector.matches(&serde_json::json!({"docType": "label", "gtin": "42"})));
        assert!(!selector.matches(&serde_json::json!(["docType"])));
    }
}
