//! Supersession chains.
//!
//! A lineage is the set of versions linked by `supersedes`. The oldest version
//! is the lineage root; its id names the lineage. `supersededBy` is only set
//! once a successor is active, so forward walks stop at the newest reviewed
//! version while backward walks reach the root from any version.

use crate::error::{RegistryError, RegistryResult};
use crate::store::AssetTx;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;
use viridian_types::{Asset, AssetId, AssetKind};

/// Fields owned by the registry. Clients never set them.
pub const MANAGED_FIELDS: [&str; 11] = [
    "id",
    "docType",
    "status",
    "score",
    "createdBy",
    "createdAt",
    "updatedBy",
    "updatedAt",
    "supersedes",
    "supersededBy",
    "changeReason",
];

/// Every version ever created in one lineage, in creation order.
///
/// Preliminary successors are only reachable through this record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineageIndex {
    pub root: AssetId,
    pub versions: Vec<AssetId>,
}

impl LineageIndex {
    pub fn key(root: &AssetId) -> String {
        format!("lineage-{root}")
    }

    pub async fn load(tx: &mut AssetTx, root: &AssetId) -> RegistryResult<Self> {
        Ok(tx
            .get_json::<LineageIndex>(&Self::key(root))
            .await?
            .unwrap_or_else(|| LineageIndex {
                root: root.clone(),
                versions: vec![root.clone()],
            }))
    }

    /// Append `version` to the lineage rooted at `root`.
    pub async fn record(tx: &mut AssetTx, root: &AssetId, version: &AssetId) -> RegistryResult<()> {
        let mut index = match tx.get_json::<LineageIndex>(&Self::key(root)).await? {
            Some(index) => index,
            None => LineageIndex {
                root: root.clone(),
                versions: Vec::new(),
            },
        };
        if !index.versions.contains(version) {
            index.versions.push(version.clone());
        }
        tx.put_json(&Self::key(root), &index).await
    }
}

/// Predecessors of `start`, newest first.
///
/// Fails with a storage integrity error on cycles, dangling links, creation
/// times that do not strictly decrease, or chains longer than `max_depth`.
pub async fn ancestors(
    tx: &mut AssetTx,
    start: &Asset,
    max_depth: usize,
) -> RegistryResult<Vec<Asset>> {
    let doc_type = start.doc_type();
    let mut visited = HashSet::from([start.id().clone()]);
    let mut chain = Vec::new();
    let mut current = start.clone();

    while let Some(previous_id) = current.supersedes().cloned() {
        if chain.len() >= max_depth {
            return Err(RegistryError::corrupt(format!(
                "lineage of {} exceeds {max_depth} versions",
                start.id()
            )));
        }
        if !visited.insert(previous_id.clone()) {
            return Err(RegistryError::corrupt(format!(
                "supersedes cycle through {previous_id}"
            )));
        }
        let previous = tx.load_linked(doc_type, &previous_id).await?;
        if previous.created_at() >= current.created_at() {
            return Err(RegistryError::corrupt(format!(
                "{previous_id} is not older than its successor {}",
                current.id()
            )));
        }
        chain.push(previous.clone());
        current = previous;
    }
    Ok(chain)
}

/// Active successors of `start`, oldest first.
pub async fn successors(
    tx: &mut AssetTx,
    start: &Asset,
    max_depth: usize,
) -> RegistryResult<Vec<Asset>> {
    let doc_type = start.doc_type();
    let mut visited = HashSet::from([start.id().clone()]);
    let mut chain = Vec::new();
    let mut current = start.clone();

    while let Some(next_id) = current.superseded_by().cloned() {
        if chain.len() >= max_depth {
            return Err(RegistryError::corrupt(format!(
                "lineage of {} exceeds {max_depth} versions",
                start.id()
            )));
        }
        if !visited.insert(next_id.clone()) {
            return Err(RegistryError::corrupt(format!(
                "supersededBy cycle through {next_id}"
            )));
        }
        let next = tx.load_linked(doc_type, &next_id).await?;
        if next.supersedes() != Some(current.id()) {
            return Err(RegistryError::corrupt(format!(
                "{} names {next_id} as successor but {next_id} does not supersede it",
                current.id()
            )));
        }
        if next.created_at() <= current.created_at() {
            return Err(RegistryError::corrupt(format!(
                "{next_id} is not newer than its predecessor {}",
                current.id()
            )));
        }
        chain.push(next.clone());
        current = next;
    }
    Ok(chain)
}

/// Id of the oldest version in `asset`'s lineage.
pub async fn lineage_root(
    tx: &mut AssetTx,
    asset: &Asset,
    max_depth: usize,
) -> RegistryResult<AssetId> {
    Ok(ancestors(tx, asset, max_depth)
        .await?
        .last()
        .map(|root| root.id().clone())
        .unwrap_or_else(|| asset.id().clone()))
}

/// The chain through `asset`: its predecessors, itself, its active successors.
pub async fn chain_through(
    tx: &mut AssetTx,
    asset: &Asset,
    max_depth: usize,
) -> RegistryResult<Vec<Asset>> {
    let mut chain = ancestors(tx, asset, max_depth).await?;
    chain.reverse();
    chain.push(asset.clone());
    chain.extend(successors(tx, asset, max_depth).await?);
    debug!(asset = %asset.id(), versions = chain.len(), "lineage walked");
    Ok(chain)
}

/// Newest version reachable through `supersededBy`.
pub async fn latest(tx: &mut AssetTx, asset: &Asset, max_depth: usize) -> RegistryResult<Asset> {
    Ok(successors(tx, asset, max_depth)
        .await?
        .pop()
        .unwrap_or_else(|| asset.clone()))
}

/// Creation time of a successor, forced past its predecessor's.
pub fn successor_timestamp(predecessor: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > predecessor {
        now
    } else {
        predecessor + Duration::microseconds(1)
    }
}

/// Overlay client-supplied fields on a predecessor payload.
///
/// Only the type-specific updatable fields may appear. The returned payload
/// has a zero score and still needs validation.
pub fn merge_fields(predecessor: &AssetKind, new_fields: &Value) -> RegistryResult<AssetKind> {
    let overrides = new_fields
        .as_object()
        .ok_or_else(|| RegistryError::invalid("newFields must be a JSON object"))?;
    if overrides.is_empty() {
        return Err(RegistryError::invalid(
            "newFields must override at least one field",
        ));
    }

    let doc_type = predecessor.doc_type();
    let allowed = AssetKind::updatable_fields(doc_type);
    for field in overrides.keys() {
        if MANAGED_FIELDS.contains(&field.as_str()) {
            return Err(RegistryError::invalid(format!(
                "{field} is managed by the registry"
            )));
        }
        if !allowed.contains(&field.as_str()) {
            return Err(RegistryError::invalid(format!(
                "{field} cannot be updated on a {doc_type}"
            )));
        }
    }

    let mut merged = serde_json::to_value(predecessor)?;
    let Some(fields) = merged.as_object_mut() else {
        return Err(RegistryError::corrupt(format!(
            "{doc_type} payload does not serialize to an object"
        )));
    };
    for (field, value) in overrides {
        fields.insert(field.clone(), value.clone());
    }

    let mut kind: AssetKind = serde_json::from_value(merged)
        .map_err(|err| RegistryError::invalid(format!("newFields: {err}")))?;
    kind.reset_score();
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use viridian_types::{Producer, Score};

    fn producer() -> AssetKind {
        AssetKind::Producer(Producer {
            score: Score {
                society: 40,
                ..Score::ZERO
            },
            name: "Wander AG".to_string(),
            address: Some("Bern".to_string()),
            url: None,
            labels: vec![],
        })
    }

    #[test]
    fn merge_overrides_named_fields_and_resets_score() {
        let fields = json!({"name": "Wander", "url": "https://wander.ch"});
        let merged = merge_fields(&producer(), &fields).unwrap();
        let AssetKind::Producer(p) = merged else {
            panic!("kind changed");
        };
        assert_eq!(p.name, "Wander");
        assert_eq!(p.address.as_deref(), Some("Bern"));
        assert_eq!(p.url.as_deref(), Some("https://wander.ch"));
        assert_eq!(p.score, Score::ZERO);
    }

    #[test]
    fn merge_rejects_managed_and_foreign_fields() {
        for fields in [
            json!({"status": "active"}),
            json!({"docType": "label"}),
            json!({"score": {"environment": 100}}),
            json!({"gtin": "42"}),
        ] {
            let err = merge_fields(&producer(), &fields).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{fields}");
        }
    }

    #[test]
    fn merge_requires_a_non_empty_object() {
        assert!(merge_fields(&producer(), &json!([])).is_err());
        assert!(merge_fields(&producer(), &json!({})).is_err());
    }

    #[test]
    fn merge_reports_ill_typed_values() {
        let err = merge_fields(&producer(), &json!({"name": null})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn successor_time_is_strictly_later() {
        let base = Utc::now();
        assert!(successor_timestamp(base, base) > base);
        assert!(successor_timestamp(base, base - Duration::seconds(5)) > base);
        let later = base + Duration::seconds(1);
        assert_eq!(successor_timestamp(base, later), later);
    }
}
