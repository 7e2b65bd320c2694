//! Product containment graph.
//!
//! Nodes are product lineages. Expanding a node follows the
//! `containedProducts` edges of every live version in it, so a pending update
//! closes a cycle just like an active one would.

use crate::chain::{self, LineageIndex};
use crate::error::{RegistryError, RegistryResult};
use crate::store::AssetTx;
use std::collections::{HashSet, VecDeque};
use tracing::debug;
use viridian_types::{AssetId, DocType};

/// Check that `product_id` containing `contained` keeps the graph acyclic.
///
/// `product_id` may name an existing version (an update) or an unused id (a
/// creation). Unknown contained ids fail with `NotFound`.
pub async fn validate_containment(
    tx: &mut AssetTx,
    product_id: &AssetId,
    contained: &[AssetId],
    max_depth: usize,
) -> RegistryResult<()> {
    if contained.contains(product_id) {
        return Err(RegistryError::CyclicContainment {
            product: product_id.clone(),
            via: product_id.clone(),
        });
    }

    let target = match tx.load(DocType::Product, product_id).await? {
        Some(existing) => chain::lineage_root(tx, &existing, max_depth).await?,
        None => product_id.clone(),
    };

    let mut visited: HashSet<AssetId> = HashSet::new();
    let mut queue: VecDeque<(AssetId, AssetId)> = VecDeque::new();

    for child_id in contained {
        let child = tx
            .load(DocType::Product, child_id)
            .await?
            .ok_or_else(|| {
                RegistryError::NotFound(format!("containedProducts: product {child_id}"))
            })?;
        let root = chain::lineage_root(tx, &child, max_depth).await?;
        if root == target {
            return Err(RegistryError::CyclicContainment {
                product: product_id.clone(),
                via: child_id.clone(),
            });
        }
        if visited.insert(root.clone()) {
            queue.push_back((root, child_id.clone()));
        }
    }

    while let Some((lineage, via)) = queue.pop_front() {
        let index = LineageIndex::load(tx, &lineage).await?;
        for version_id in &index.versions {
            let version = tx.load_linked(DocType::Product, version_id).await?;
            if !version.status().is_live() {
                continue;
            }
            let Some(product) = version.as_product() else {
                continue;
            };
            for grandchild_id in product.contained_products.clone() {
                let grandchild = tx.load_linked(DocType::Product, &grandchild_id).await?;
                let root = chain::lineage_root(tx, &grandchild, max_depth).await?;
                if root == target {
                    return Err(RegistryError::CyclicContainment {
                        product: product_id.clone(),
                        via,
                    });
                }
                if visited.insert(root.clone()) {
                    queue.push_back((root, via.clone()));
                }
            }
        }
    }

    debug!(product = %product_id, lineages = visited.len(), "containment acyclic");
    Ok(())
}
