use crate::validate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, globally unique identifier of one asset version.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller identity as resolved by the identity gate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminator distinguishing asset kinds that share one key space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Product,
    Producer,
    Label,
    Information,
}

impl DocType {
    /// Probe order used when an asset is looked up by bare id.
    pub const ALL: [DocType; 4] = [
        DocType::Product,
        DocType::Producer,
        DocType::Label,
        DocType::Information,
    ];

    /// Kinds that carry a score and may be targeted by information records.
    pub const SCORABLE: [DocType; 3] = [DocType::Product, DocType::Producer, DocType::Label];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Product => "product",
            DocType::Producer => "producer",
            DocType::Label => "label",
            DocType::Information => "information",
        }
    }

    pub fn is_scorable(&self) -> bool {
        !matches!(self, DocType::Information)
    }

    /// Primary storage key: `docType + "-" + id`.
    pub fn key_for(&self, id: &AssetId) -> String {
        format!("{}-{}", self.as_str(), id.0)
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocType::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownDocType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_joins_doc_type_and_id() {
        let id = AssetId::new("1fcc2c43");
        assert_eq!(DocType::Product.key_for(&id), "product-1fcc2c43");
        assert_eq!(DocType::Information.key_for(&id), "information-1fcc2c43");
    }

    #[test]
    fn doc_type_parses_its_own_rendering() {
        for doc_type in DocType::ALL {
            assert_eq!(doc_type.as_str().parse::<DocType>().unwrap(), doc_type);
        }
        assert!(matches!(
            "marble".parse::<DocType>(),
            Err(ValidationError::UnknownDocType(_))
        ));
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(AssetId::generate(), AssetId::generate());
    }
}
