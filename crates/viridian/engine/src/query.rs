//! Attribute lookups through the selector query engine.
//!
//! Values are matched as strings, except `weight`, which is matched as an
//! integer. Structured fields cannot be queried. Results may be stale with
//! respect to concurrent commits.

use crate::error::{RegistryError, RegistryResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};
use viridian_storage::{Selector, SelectorQueryEngine};
use viridian_types::{Asset, DocType};

static FIELD_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid regex"));

/// Fields holding integers.
const NUMERIC_FIELDS: &[&str] = &["weight"];

/// Fields holding objects or lists.
const STRUCTURED_FIELDS: &[&str] = &[
    "score",
    "labels",
    "containedProducts",
    "locales",
    "sources",
];

/// One decoded query result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub key: String,
    pub asset: Asset,
}

/// Selector matching records of `doc_type` whose `field` equals `value`.
pub fn attribute_selector(doc_type: DocType, field: &str, value: &str) -> RegistryResult<Selector> {
    if !FIELD_RULE.is_match(field) {
        return Err(RegistryError::invalid(format!(
            "'{field}' is not a queryable field name"
        )));
    }
    if field == "docType" {
        return Err(RegistryError::invalid("docType is fixed by the query kind"));
    }
    if STRUCTURED_FIELDS.contains(&field) {
        return Err(RegistryError::invalid(format!(
            "'{field}' holds structured data and cannot be queried"
        )));
    }
    let selector = Selector::new().field_eq("docType", doc_type.as_str());
    if NUMERIC_FIELDS.contains(&field) {
        let number: i64 = value.trim().parse().map_err(|_| {
            RegistryError::invalid(format!("'{field}' expects an integer, got '{value}'"))
        })?;
        return Ok(selector.field_eq(field, number));
    }
    Ok(selector.field_eq(field, value))
}

pub async fn find_by_attribute<E>(
    engine: &E,
    doc_type: DocType,
    field: &str,
    value: &str,
) -> RegistryResult<Vec<QueryHit>>
where
    E: SelectorQueryEngine + ?Sized,
{
    let selector = attribute_selector(doc_type, field, value)?;
    debug!(query = %selector.to_query_string(), "selector query");

    let mut hits = Vec::new();
    for row in engine.query(&selector).await? {
        let asset: Asset = serde_json::from_slice(&row.value)?;
        if asset.key() != row.key {
            warn!(key = %row.key, stored = %asset.key(), "query hit under foreign key");
            return Err(RegistryError::corrupt(format!(
                "record under {} claims key {}",
                row.key,
                asset.key()
            )));
        }
        hits.push(QueryHit { key: row.key, asset });
    }
    Ok(hits)
}
