use crate::chain::{self, LineageIndex};
use crate::claims;
use crate::config::EngineConfig;
use crate::containment;
use crate::error::{RegistryError, RegistryResult};
use crate::lifecycle;
use crate::query::{self, QueryHit};
use crate::scoring::{ScoreAggregator, ScorePolicy};
use crate::store::AssetTx;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use viridian_identity::{CallContext, IdentityProvider, ResolvedCaller};
use viridian_storage::{CommitReceipt, RegistryStorage};
use viridian_types::{Asset, AssetId, AssetKind, DocType, ReviewOutcome, Validate};

/// Effect of one review outcome.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub asset: Asset,
    /// Predecessor moved to outdated by this approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdated: Option<AssetId>,
    /// Targets whose score changed.
    pub rescored: Vec<AssetId>,
    pub released_gtins: Vec<String>,
}

/// One committed value of an asset record.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub tx_id: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub asset: Asset,
}

/// The registry core.
///
/// Mutations come in two forms: the plain operation (resolve caller, begin,
/// stage, commit) and its `stage_*` half, which writes into a caller-owned
/// transaction and leaves the commit to the caller.
pub struct Registry {
    storage: Arc<dyn RegistryStorage>,
    identity: Arc<dyn IdentityProvider>,
    aggregator: ScoreAggregator,
    config: EngineConfig,
}

impl Registry {
    pub fn new(storage: Arc<dyn RegistryStorage>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            storage,
            identity,
            aggregator: ScoreAggregator::default(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn ScorePolicy>) -> Self {
        self.aggregator = ScoreAggregator::new(policy);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Access the underlying storage backend.
    pub fn storage(&self) -> Arc<dyn RegistryStorage> {
        Arc::clone(&self.storage)
    }

    pub fn resolve_caller(&self, context: &CallContext) -> RegistryResult<ResolvedCaller> {
        Ok(viridian_identity::resolve_caller(self.identity.as_ref(), context)?)
    }

    pub async fn begin(&self) -> RegistryResult<AssetTx> {
        Ok(AssetTx::new(self.storage.begin().await?))
    }

    pub async fn commit(&self, tx: AssetTx) -> RegistryResult<CommitReceipt> {
        let tx_id = tx.tx_id().to_string();
        match tx.commit().await {
            Ok(receipt) => {
                debug!(tx = %tx_id, sequence = receipt.sequence, "transaction committed");
                Ok(receipt)
            }
            Err(err @ RegistryError::ConflictAborted(_)) => {
                warn!(tx = %tx_id, error = %err, "transaction aborted by conflict");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    // ── creation ────────────────────────────────────────────────────

    /// Create the first version of a new asset. `None` allocates an id.
    pub async fn create_asset(
        &self,
        context: &CallContext,
        requested: Option<AssetId>,
        kind: AssetKind,
    ) -> RegistryResult<Asset> {
        let caller = self.resolve_caller(context)?;
        let mut tx = self.begin().await?;
        let asset = self.stage_create(&mut tx, &caller, requested, kind).await?;
        self.commit(tx).await?;
        info!(
            asset = %asset.id(),
            doc_type = %asset.doc_type(),
            status = %asset.status(),
            created_by = %caller.identity(),
            "asset created"
        );
        Ok(asset)
    }

    pub async fn stage_create(
        &self,
        tx: &mut AssetTx,
        caller: &ResolvedCaller,
        requested: Option<AssetId>,
        kind: AssetKind,
    ) -> RegistryResult<Asset> {
        kind.validate()?;
        let id = match requested {
            Some(id) if id.as_str().trim().is_empty() => {
                return Err(RegistryError::invalid("id must not be blank"));
            }
            Some(id) => id,
            None => AssetId::generate(),
        };
        if !tx.id_is_free(&id).await? {
            return Err(RegistryError::invalid(format!("id {id} is already in use")));
        }

        self.check_references(tx, &id, &kind).await?;
        let asset = Asset::preliminary(id, caller.identity().clone(), Utc::now(), kind);
        let root = asset.id().clone();
        self.stage_indexes(tx, &asset, &root).await?;
        tx.put_asset(&asset).await?;
        Ok(asset)
    }

    // ── supersession ────────────────────────────────────────────────

    /// Create a preliminary successor of an active version.
    pub async fn create_update(
        &self,
        context: &CallContext,
        predecessor: &AssetId,
        new_fields: &Value,
        change_reason: &str,
    ) -> RegistryResult<Asset> {
        let caller = self.resolve_caller(context)?;
        let mut tx = self.begin().await?;
        let asset = self
            .stage_update(&mut tx, &caller, predecessor, new_fields, change_reason)
            .await?;
        self.commit(tx).await?;
        info!(
            asset = %asset.id(),
            supersedes = %predecessor,
            doc_type = %asset.doc_type(),
            "update proposed"
        );
        Ok(asset)
    }

    pub async fn stage_update(
        &self,
        tx: &mut AssetTx,
        caller: &ResolvedCaller,
        predecessor_id: &AssetId,
        new_fields: &Value,
        change_reason: &str,
    ) -> RegistryResult<Asset> {
        let reason = change_reason.trim();
        if reason.is_empty() && self.config.require_change_reason {
            return Err(RegistryError::invalid("changeReason is required"));
        }

        let predecessor = tx.locate(predecessor_id).await?;
        lifecycle::ensure_supersedable(predecessor.id(), predecessor.status())?;
        let kind = chain::merge_fields(&predecessor.kind, new_fields)?;
        kind.validate()?;

        let root = chain::lineage_root(tx, &predecessor, self.config.max_lineage_depth).await?;
        self.check_references(tx, predecessor.id(), &kind).await?;

        let id = AssetId::generate();
        if !tx.id_is_free(&id).await? {
            return Err(RegistryError::corrupt(format!("allocated id {id} is taken")));
        }
        let created_at = chain::successor_timestamp(predecessor.created_at(), Utc::now());
        let mut asset = Asset::preliminary(id, caller.identity().clone(), created_at, kind);
        asset.revision.supersedes = Some(predecessor.id().clone());
        asset.revision.change_reason = (!reason.is_empty()).then(|| reason.to_string());

        self.stage_indexes(tx, &asset, &root).await?;
        tx.put_asset(&asset).await?;
        Ok(asset)
    }

    // ── review ──────────────────────────────────────────────────────

    /// Apply an outcome of the external review mechanism.
    pub async fn apply_review_outcome(
        &self,
        context: &CallContext,
        id: &AssetId,
        outcome: ReviewOutcome,
    ) -> RegistryResult<ReviewReport> {
        let reviewer = self.resolve_caller(context)?;
        let mut tx = self.begin().await?;
        let report = self
            .stage_review_outcome(&mut tx, &reviewer, id, outcome)
            .await?;
        self.commit(tx).await?;
        info!(
            asset = %id,
            outcome = %outcome,
            status = %report.asset.status(),
            reviewer = %reviewer.identity(),
            "review outcome applied"
        );
        Ok(report)
    }

    pub async fn stage_review_outcome(
        &self,
        tx: &mut AssetTx,
        reviewer: &ResolvedCaller,
        id: &AssetId,
        outcome: ReviewOutcome,
    ) -> RegistryResult<ReviewReport> {
        let mut asset = tx.locate(id).await?;
        let next = lifecycle::transition(asset.id(), asset.status(), outcome)?;
        let now = Utc::now();

        let mut predecessor = None;
        if outcome == ReviewOutcome::Approve {
            if let Some(previous_id) = asset.supersedes().cloned() {
                let mut previous = tx.load_linked(asset.doc_type(), &previous_id).await?;
                previous.reviewable.status = lifecycle::outdate(&previous_id, previous.status())?;
                previous.revision.superseded_by = Some(asset.id().clone());
                previous.revision.updated_by = reviewer.identity().clone();
                previous.revision.updated_at = now;
                tx.put_asset(&previous).await?;
                debug!(asset = %previous_id, successor = %asset.id(), "predecessor outdated");
                predecessor = Some(previous);
            }
        }

        asset.reviewable.status = next;
        asset.revision.updated_by = reviewer.identity().clone();
        asset.revision.updated_at = now;
        tx.put_asset(&asset).await?;

        let mut rescored = Vec::new();
        let mut released_gtins = Vec::new();
        match asset.doc_type() {
            DocType::Information => {
                rescored = match (outcome, &predecessor) {
                    (ReviewOutcome::Approve, Some(previous)) => {
                        self.aggregator
                            .on_information_superseded(tx, previous, &asset)
                            .await?
                    }
                    (ReviewOutcome::Approve, None) => {
                        self.aggregator.on_information_approved(tx, &asset).await?
                    }
                    (ReviewOutcome::ApproveDelete, _) => {
                        self.aggregator.on_information_retracted(tx, &asset).await?
                    }
                    (ReviewOutcome::Reject, _) => {
                        self.aggregator.detach_pending(tx, &asset).await?;
                        Vec::new()
                    }
                };
            }
            DocType::Product => {
                let root = chain::lineage_root(tx, &asset, self.config.max_lineage_depth).await?;
                released_gtins = claims::reconcile(tx, &root).await?;
            }
            DocType::Producer | DocType::Label => {}
        }

        Ok(ReviewReport {
            asset,
            outdated: predecessor.map(|p| p.id().clone()),
            rescored,
            released_gtins,
        })
    }

    // ── containment ─────────────────────────────────────────────────

    /// Check, without writing, that `product_id` may contain `contained`.
    pub async fn validate_containment(
        &self,
        product_id: &AssetId,
        contained: &[AssetId],
    ) -> RegistryResult<()> {
        let mut tx = self.begin().await?;
        containment::validate_containment(
            &mut tx,
            product_id,
            contained,
            self.config.max_lineage_depth,
        )
        .await
    }

    // ── reads ───────────────────────────────────────────────────────

    pub async fn get_asset(&self, id: &AssetId) -> RegistryResult<Asset> {
        let mut tx = self.begin().await?;
        tx.locate(id).await
    }

    /// Versions of `id`'s lineage, oldest first.
    pub async fn lineage(&self, id: &AssetId) -> RegistryResult<Vec<Asset>> {
        let mut tx = self.begin().await?;
        let asset = tx.locate(id).await?;
        chain::chain_through(&mut tx, &asset, self.config.max_lineage_depth).await
    }

    /// Newest reviewed version reachable from `id`.
    pub async fn latest(&self, id: &AssetId) -> RegistryResult<Asset> {
        let mut tx = self.begin().await?;
        let asset = tx.locate(id).await?;
        chain::latest(&mut tx, &asset, self.config.max_lineage_depth).await
    }

    /// Every committed value of `id`'s record, oldest first.
    pub async fn history(&self, id: &AssetId) -> RegistryResult<Vec<HistoryEntry>> {
        let key = self.get_asset(id).await?.key();
        let mut entries = Vec::new();
        for modification in self.storage.history(&key).await? {
            entries.push(HistoryEntry {
                asset: serde_json::from_slice(&modification.value)?,
                tx_id: modification.tx_id,
                sequence: modification.sequence,
                timestamp: modification.timestamp,
            });
        }
        Ok(entries)
    }

    pub async fn find_by_attribute(
        &self,
        doc_type: DocType,
        field: &str,
        value: &str,
    ) -> RegistryResult<Vec<QueryHit>> {
        query::find_by_attribute(self.storage.as_ref(), doc_type, field, value).await
    }

    pub async fn products_by_gtin(&self, gtin: &str) -> RegistryResult<Vec<QueryHit>> {
        if gtin.is_empty() || !gtin.chars().all(|c| c.is_ascii_digit()) {
            return Err(RegistryError::invalid(format!(
                "'{gtin}' is not a numeric barcode"
            )));
        }
        self.find_by_attribute(DocType::Product, "gtin", gtin).await
    }

    // ── helpers ─────────────────────────────────────────────────────

    /// Resolve every id the payload references. `own_id` names the version
    /// (or, for updates, the predecessor) the payload belongs to.
    async fn check_references(
        &self,
        tx: &mut AssetTx,
        own_id: &AssetId,
        kind: &AssetKind,
    ) -> RegistryResult<()> {
        match kind {
            AssetKind::Product(product) => {
                containment::validate_containment(
                    tx,
                    own_id,
                    &product.contained_products,
                    self.config.max_lineage_depth,
                )
                .await?;
                for contained in &product.contained_products {
                    tx.load_reference("containedProducts", DocType::Product, contained)
                        .await?;
                }
                if let Some(producer) = &product.producer {
                    tx.load_reference("producer", DocType::Producer, producer)
                        .await?;
                }
            }
            AssetKind::Producer(_) | AssetKind::Label(_) => {}
            AssetKind::Information(info) => {
                let target = tx.locate(&info.target).await?;
                if !target.doc_type().is_scorable() {
                    return Err(RegistryError::invalid(format!(
                        "target {} is a {}, not a scorable asset",
                        info.target,
                        target.doc_type()
                    )));
                }
                if !target.status().is_live() {
                    return Err(RegistryError::invalid(format!(
                        "target {} is {}",
                        info.target,
                        target.status()
                    )));
                }
            }
        }
        for label in kind.labels() {
            tx.load_reference("labels", DocType::Label, label).await?;
        }
        Ok(())
    }

    /// Lineage membership, barcode claim and evidence attachment of a new version.
    async fn stage_indexes(
        &self,
        tx: &mut AssetTx,
        asset: &Asset,
        root: &AssetId,
    ) -> RegistryResult<()> {
        LineageIndex::record(tx, root, asset.id()).await?;
        match &asset.kind {
            AssetKind::Product(product) => {
                if let Some(gtin) = &product.gtin {
                    claims::claim(tx, gtin, root).await?;
                }
            }
            AssetKind::Information(_) => {
                self.aggregator.attach_pending(tx, asset).await?;
            }
            AssetKind::Producer(_) | AssetKind::Label(_) => {}
        }
        Ok(())
    }
}
