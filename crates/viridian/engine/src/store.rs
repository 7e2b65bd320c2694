use crate::error::{RegistryError, RegistryResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use viridian_storage::{CommitReceipt, LedgerTransaction};
use viridian_types::{Asset, AssetId, AssetStatus, DocType};

/// Typed view over one ledger transaction.
///
/// Assets live under `docType-id`; index records (lineages, evidence, barcode
/// claims) live under their own prefixes and carry no `docType`.
pub struct AssetTx {
    inner: Box<dyn LedgerTransaction>,
}

impl AssetTx {
    pub fn new(inner: Box<dyn LedgerTransaction>) -> Self {
        Self { inner }
    }

    pub fn tx_id(&self) -> &str {
        self.inner.tx_id()
    }

    pub async fn get_json<T: DeserializeOwned>(&mut self, key: &str) -> RegistryResult<Option<T>> {
        match self.inner.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize>(&mut self, key: &str, value: &T) -> RegistryResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.inner.put(key, bytes).await?;
        Ok(())
    }

    /// Load the version stored under `doc_type`'s key for `id`.
    pub async fn load(&mut self, doc_type: DocType, id: &AssetId) -> RegistryResult<Option<Asset>> {
        let key = doc_type.key_for(id);
        let Some(asset) = self.get_json::<Asset>(&key).await? else {
            return Ok(None);
        };
        if asset.doc_type() != doc_type || asset.id() != id {
            return Err(RegistryError::corrupt(format!(
                "record under {key} is {}-{}",
                asset.doc_type(),
                asset.id()
            )));
        }
        Ok(Some(asset))
    }

    /// Load by bare id, probing kinds in fixed order.
    pub async fn locate(&mut self, id: &AssetId) -> RegistryResult<Asset> {
        self.locate_among(&DocType::ALL, id).await
    }

    pub async fn locate_among(&mut self, kinds: &[DocType], id: &AssetId) -> RegistryResult<Asset> {
        for doc_type in kinds {
            if let Some(asset) = self.load(*doc_type, id).await? {
                return Ok(asset);
            }
        }
        Err(RegistryError::NotFound(format!("asset {id}")))
    }

    /// Load a version that must exist, reporting a dangling link otherwise.
    pub async fn load_linked(&mut self, doc_type: DocType, id: &AssetId) -> RegistryResult<Asset> {
        self.load(doc_type, id)
            .await?
            .ok_or_else(|| RegistryError::corrupt(format!("dangling link to {doc_type}-{id}")))
    }

    /// Load a referenced asset of an expected kind that still takes part in the registry.
    pub async fn load_reference(
        &mut self,
        field: &str,
        doc_type: DocType,
        id: &AssetId,
    ) -> RegistryResult<Asset> {
        let asset = self
            .load(doc_type, id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("{field}: {doc_type} {id}")))?;
        if matches!(asset.status(), AssetStatus::Rejected | AssetStatus::Deleted) {
            return Err(RegistryError::invalid(format!(
                "{field}: {doc_type} {id} is {}",
                asset.status()
            )));
        }
        Ok(asset)
    }

    /// Whether no kind stores a record under `id`.
    pub async fn id_is_free(&mut self, id: &AssetId) -> RegistryResult<bool> {
        for doc_type in DocType::ALL {
            if self.inner.get(&doc_type.key_for(id)).await?.is_some() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn put_asset(&mut self, asset: &Asset) -> RegistryResult<()> {
        self.put_json(&asset.key(), asset).await
    }

    pub async fn commit(mut self) -> RegistryResult<CommitReceipt> {
        Ok(self.inner.commit().await?)
    }
}
