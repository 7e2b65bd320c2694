//! Score aggregation.
//!
//! Each scorable version owns an evidence index listing the information
//! records targeting it: pending ones (under review) and active ones. A
//! target's score is a pure function of its active evidence, recomputed
//! inside the review transaction that changed that set. Creating evidence
//! writes the index too, so concurrent writers on one target conflict at
//! commit instead of losing each other's entries.

use crate::config::ScoringConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::store::AssetTx;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use viridian_types::{
    Asset, AssetId, AssetStatus, DocType, Information, Score, DIMENSIONS,
};

/// Weighting of active evidence into unclamped dimension totals.
pub trait ScorePolicy: Send + Sync {
    fn aggregate(&self, evidence: &[&Information]) -> [i64; DIMENSIONS];
}

/// Default policy: `weight * factor(category, dimension) / 100` per record, summed.
#[derive(Clone, Debug, Default)]
pub struct CategoryWeightedPolicy {
    factors: ScoringConfig,
}

impl CategoryWeightedPolicy {
    pub fn new(factors: ScoringConfig) -> Self {
        Self { factors }
    }
}

impl ScorePolicy for CategoryWeightedPolicy {
    fn aggregate(&self, evidence: &[&Information]) -> [i64; DIMENSIONS] {
        let mut totals = [0i64; DIMENSIONS];
        for info in evidence {
            let factors = self.factors.factors(info.category).to_array();
            for (total, factor) in totals.iter_mut().zip(factors) {
                *total = total.saturating_add(i64::from(info.weight) * factor / 100);
            }
        }
        totals
    }
}

/// Information records attached to one scorable version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceIndex {
    pub pending: BTreeSet<AssetId>,
    pub active: BTreeSet<AssetId>,
}

impl EvidenceIndex {
    pub fn key(target: &AssetId) -> String {
        format!("evidence-{target}")
    }

    pub async fn load(tx: &mut AssetTx, target: &AssetId) -> RegistryResult<Self> {
        Ok(tx
            .get_json::<EvidenceIndex>(&Self::key(target))
            .await?
            .unwrap_or_default())
    }

    pub async fn store(&self, tx: &mut AssetTx, target: &AssetId) -> RegistryResult<()> {
        tx.put_json(&Self::key(target), self).await
    }
}

/// Runs the score triggers against a [`ScorePolicy`].
#[derive(Clone)]
pub struct ScoreAggregator {
    policy: Arc<dyn ScorePolicy>,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(Arc::new(CategoryWeightedPolicy::default()))
    }
}

impl ScoreAggregator {
    pub fn new(policy: Arc<dyn ScorePolicy>) -> Self {
        Self { policy }
    }

    /// Attach a freshly created information version to its target. No rescoring.
    pub async fn attach_pending(&self, tx: &mut AssetTx, info: &Asset) -> RegistryResult<()> {
        let target = target_of(info)?;
        let mut index = EvidenceIndex::load(tx, target).await?;
        index.pending.insert(info.id().clone());
        index.store(tx, target).await
    }

    /// Drop a rejected information version from its target. No rescoring.
    pub async fn detach_pending(&self, tx: &mut AssetTx, info: &Asset) -> RegistryResult<()> {
        let target = target_of(info)?;
        let mut index = EvidenceIndex::load(tx, target).await?;
        if index.pending.remove(info.id()) {
            index.store(tx, target).await?;
        }
        Ok(())
    }

    /// `info` became active with no predecessor.
    pub async fn on_information_approved(
        &self,
        tx: &mut AssetTx,
        info: &Asset,
    ) -> RegistryResult<Vec<AssetId>> {
        let target = target_of(info)?.clone();
        let mut index = EvidenceIndex::load(tx, &target).await?;
        index.pending.remove(info.id());
        index.active.insert(info.id().clone());
        index.store(tx, &target).await?;
        Ok(self.recompute(tx, &target).await?.into_iter().collect())
    }

    /// `new` became active and outdated `old`. Both targets are rescored.
    pub async fn on_information_superseded(
        &self,
        tx: &mut AssetTx,
        old: &Asset,
        new: &Asset,
    ) -> RegistryResult<Vec<AssetId>> {
        let old_target = target_of(old)?.clone();
        let new_target = target_of(new)?.clone();

        let mut old_index = EvidenceIndex::load(tx, &old_target).await?;
        old_index.active.remove(old.id());
        old_index.store(tx, &old_target).await?;

        let mut new_index = EvidenceIndex::load(tx, &new_target).await?;
        new_index.pending.remove(new.id());
        new_index.active.insert(new.id().clone());
        new_index.store(tx, &new_target).await?;

        let mut rescored = Vec::new();
        rescored.extend(self.recompute(tx, &old_target).await?);
        if new_target != old_target {
            rescored.extend(self.recompute(tx, &new_target).await?);
        }
        Ok(rescored)
    }

    /// `info` was deleted.
    pub async fn on_information_retracted(
        &self,
        tx: &mut AssetTx,
        info: &Asset,
    ) -> RegistryResult<Vec<AssetId>> {
        let target = target_of(info)?.clone();
        let mut index = EvidenceIndex::load(tx, &target).await?;
        index.active.remove(info.id());
        index.store(tx, &target).await?;
        Ok(self.recompute(tx, &target).await?.into_iter().collect())
    }

    /// Recompute `target`'s score from its active evidence.
    ///
    /// Returns the target id when the stored score changed. Targets that are
    /// no longer live keep their last score.
    pub async fn recompute(
        &self,
        tx: &mut AssetTx,
        target: &AssetId,
    ) -> RegistryResult<Option<AssetId>> {
        let mut asset = tx.locate_among(&DocType::SCORABLE, target).await?;
        if !asset.status().is_live() {
            debug!(asset = %target, status = %asset.status(), "retired target not rescored");
            return Ok(None);
        }

        let index = EvidenceIndex::load(tx, target).await?;
        let mut evidence = Vec::with_capacity(index.active.len());
        for info_id in &index.active {
            let record = tx.load_linked(DocType::Information, info_id).await?;
            if record.status() != AssetStatus::Active {
                return Err(RegistryError::corrupt(format!(
                    "evidence {info_id} of {target} is {}",
                    record.status()
                )));
            }
            evidence.push(record);
        }
        let infos: Vec<&Information> = evidence.iter().filter_map(Asset::as_information).collect();
        let score = Score::clamped(self.policy.aggregate(&infos));

        let Some(current) = asset.kind.score_mut() else {
            return Err(RegistryError::corrupt(format!("{target} is not scorable")));
        };
        if *current == score {
            debug!(asset = %target, evidence = infos.len(), "score unchanged");
            return Ok(None);
        }
        *current = score;
        tx.put_asset(&asset).await?;
        info!(
            asset = %target,
            evidence = infos.len(),
            environment = score.environment,
            climate = score.climate,
            society = score.society,
            health = score.health,
            economy = score.economy,
            "score recomputed"
        );
        Ok(Some(target.clone()))
    }
}

fn target_of(info: &Asset) -> RegistryResult<&AssetId> {
    info.as_information()
        .map(|i| &i.target)
        .ok_or_else(|| {
            RegistryError::invalid(format!("{} is not an information record", info.id()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use viridian_types::InfoCategory;

    fn info(category: InfoCategory, weight: i32) -> Information {
        Information {
            title: "t".to_string(),
            category,
            target: AssetId::new("p"),
            description: String::new(),
            sources: vec![],
            weight,
        }
    }

    #[test]
    fn category_factors_scale_weights() {
        let policy = CategoryWeightedPolicy::default();
        let lca = info(InfoCategory::LifeCycleAnalysis, 40);
        let press = info(InfoCategory::PressArticle, -20);
        let totals = policy.aggregate(&[&lca, &press]);
        assert_eq!(totals, [40 - 5, 40 - 5, 10 - 5, 10 - 5, 10 - 5]);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let policy = CategoryWeightedPolicy::default();
        let a = info(InfoCategory::ExternalCosts, 33);
        let b = info(InfoCategory::Jurisdiction, -71);
        assert_eq!(policy.aggregate(&[&a, &b]), policy.aggregate(&[&b, &a]));
    }

    #[test]
    fn extreme_weights_clamp() {
        let policy = CategoryWeightedPolicy::default();
        let heavy = info(InfoCategory::StudyOrPaper, i32::MAX);
        let score = Score::clamped(policy.aggregate(&[&heavy, &heavy, &heavy]));
        assert_eq!(score.to_array(), [100; DIMENSIONS]);
    }

    #[test]
    fn no_evidence_scores_zero() {
        let policy = CategoryWeightedPolicy::default();
        assert_eq!(Score::clamped(policy.aggregate(&[])), Score::ZERO);
    }
}
