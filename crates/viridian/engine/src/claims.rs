//! Barcode reservations.
//!
//! A barcode is reserved by writing `gtin-<barcode>` in the creating
//! transaction, so two products racing for one barcode conflict at commit.
//! The claim is held by a product lineage (named by its root id).

use crate::chain::LineageIndex;
use crate::error::{RegistryError, RegistryResult};
use crate::store::AssetTx;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;
use viridian_types::{AssetId, AssetStatus, DocType};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeClaim {
    pub gtin: String,
    pub lineage: AssetId,
    pub claimed_at: DateTime<Utc>,
    #[serde(default)]
    pub released: bool,
}

impl BarcodeClaim {
    pub fn key(gtin: &str) -> String {
        format!("gtin-{gtin}")
    }
}

/// Reserve `gtin` for the lineage rooted at `lineage`.
///
/// Succeeds without a write when the lineage already holds the claim.
pub async fn claim(tx: &mut AssetTx, gtin: &str, lineage: &AssetId) -> RegistryResult<()> {
    let key = BarcodeClaim::key(gtin);
    if let Some(existing) = tx.get_json::<BarcodeClaim>(&key).await? {
        if !existing.released {
            if &existing.lineage == lineage {
                return Ok(());
            }
            return Err(RegistryError::invalid(format!(
                "gtin {gtin} is already used by product {}",
                existing.lineage
            )));
        }
    }
    tx.put_json(
        &key,
        &BarcodeClaim {
            gtin: gtin.to_string(),
            lineage: lineage.clone(),
            claimed_at: Utc::now(),
            released: false,
        },
    )
    .await
}

/// Release the lineage's claims no live version uses any more.
///
/// A deleted lineage releases everything it holds. Returns released barcodes.
pub async fn reconcile(tx: &mut AssetTx, lineage: &AssetId) -> RegistryResult<Vec<String>> {
    let index = LineageIndex::load(tx, lineage).await?;
    let mut held = BTreeSet::new();
    let mut in_use = BTreeSet::new();
    let mut deleted = false;

    for version_id in &index.versions {
        let version = tx.load_linked(DocType::Product, version_id).await?;
        deleted |= version.status() == AssetStatus::Deleted;
        let Some(gtin) = version.as_product().and_then(|p| p.gtin.clone()) else {
            continue;
        };
        if version.status().is_live() {
            in_use.insert(gtin.clone());
        }
        held.insert(gtin);
    }
    if deleted {
        in_use.clear();
    }

    let mut released = Vec::new();
    for gtin in held.difference(&in_use) {
        let key = BarcodeClaim::key(gtin);
        let Some(mut claim) = tx.get_json::<BarcodeClaim>(&key).await? else {
            continue;
        };
        if claim.released || &claim.lineage != lineage {
            continue;
        }
        claim.released = true;
        tx.put_json(&key, &claim).await?;
        info!(gtin = %gtin, lineage = %lineage, "barcode released");
        released.push(gtin.clone());
    }
    Ok(released)
}
