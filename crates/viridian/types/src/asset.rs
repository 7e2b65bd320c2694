use crate::ids::{AssetId, DocType, Identity};
use crate::score::Score;
use crate::source::Source;
use crate::status::AssetStatus;
use crate::validate::{self, Validate, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fields every reviewable asset carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewable {
    pub id: AssetId,
    pub created_by: Identity,
    pub created_at: DateTime<Utc>,
    /// Assigned by the lifecycle state machine only.
    pub status: AssetStatus,
}

/// Version-chain fields of an updatable asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Updatable {
    pub updated_by: Identity,
    pub updated_at: DateTime<Utc>,
    /// Previous version of this asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<AssetId>,
    /// Newer version, set once that version is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_reason: Option<String>,
}

/// A persisted asset version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(flatten)]
    pub reviewable: Reviewable,
    #[serde(flatten)]
    pub revision: Updatable,
    #[serde(flatten)]
    pub kind: AssetKind,
}

impl Asset {
    /// A freshly created version awaiting review.
    pub fn preliminary(
        id: AssetId,
        creator: Identity,
        created_at: DateTime<Utc>,
        mut kind: AssetKind,
    ) -> Self {
        kind.reset_score();
        Self {
            reviewable: Reviewable {
                id,
                created_by: creator.clone(),
                created_at,
                status: AssetStatus::Preliminary,
            },
            revision: Updatable {
                updated_by: creator,
                updated_at: created_at,
                supersedes: None,
                superseded_by: None,
                change_reason: None,
            },
            kind,
        }
    }

    pub fn id(&self) -> &AssetId {
        &self.reviewable.id
    }

    pub fn status(&self) -> AssetStatus {
        self.reviewable.status
    }

    pub fn doc_type(&self) -> DocType {
        self.kind.doc_type()
    }

    pub fn key(&self) -> String {
        self.doc_type().key_for(self.id())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.reviewable.created_at
    }

    pub fn supersedes(&self) -> Option<&AssetId> {
        self.revision.supersedes.as_ref()
    }

    pub fn superseded_by(&self) -> Option<&AssetId> {
        self.revision.superseded_by.as_ref()
    }

    pub fn score(&self) -> Option<&Score> {
        self.kind.score()
    }

    pub fn as_product(&self) -> Option<&Product> {
        match &self.kind {
            AssetKind::Product(product) => Some(product),
            _ => None,
        }
    }

    pub fn as_information(&self) -> Option<&Information> {
        match &self.kind {
            AssetKind::Information(info) => Some(info),
            _ => None,
        }
    }
}

/// Concrete asset payload, discriminated by `docType`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "docType", rename_all = "lowercase")]
pub enum AssetKind {
    Product(Product),
    Producer(Producer),
    Label(Label),
    Information(Information),
}

impl AssetKind {
    pub fn doc_type(&self) -> DocType {
        match self {
            AssetKind::Product(_) => DocType::Product,
            AssetKind::Producer(_) => DocType::Producer,
            AssetKind::Label(_) => DocType::Label,
            AssetKind::Information(_) => DocType::Information,
        }
    }

    pub fn score(&self) -> Option<&Score> {
        match self {
            AssetKind::Product(p) => Some(&p.score),
            AssetKind::Producer(p) => Some(&p.score),
            AssetKind::Label(l) => Some(&l.score),
            AssetKind::Information(_) => None,
        }
    }

    pub fn score_mut(&mut self) -> Option<&mut Score> {
        match self {
            AssetKind::Product(p) => Some(&mut p.score),
            AssetKind::Producer(p) => Some(&mut p.score),
            AssetKind::Label(l) => Some(&mut l.score),
            AssetKind::Information(_) => None,
        }
    }

    /// New versions always start from the zero vector.
    pub fn reset_score(&mut self) {
        if let Some(score) = self.score_mut() {
            *score = Score::ZERO;
        }
    }

    /// Label ids referenced by this payload.
    pub fn labels(&self) -> &[AssetId] {
        match self {
            AssetKind::Product(p) => &p.labels,
            AssetKind::Producer(p) => &p.labels,
            AssetKind::Label(_) | AssetKind::Information(_) => &[],
        }
    }

    /// Fields a client may override when creating a new version.
    pub fn updatable_fields(doc_type: DocType) -> &'static [&'static str] {
        match doc_type {
            DocType::Product => &["gtin", "producer", "containedProducts", "labels", "locales"],
            DocType::Producer => &["name", "address", "url", "labels"],
            DocType::Label => &["locales", "version"],
            DocType::Information => &[
                "title",
                "description",
                "target",
                "category",
                "weight",
                "sources",
            ],
        }
    }
}

impl Validate for AssetKind {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            AssetKind::Product(p) => p.validate(),
            AssetKind::Producer(p) => p.validate(),
            AssetKind::Label(l) => l.validate(),
            AssetKind::Information(i) => i.validate(),
        }
    }
}

/// Language-specific display data of a product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLocale {
    pub lang: String,
    /// Short display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub quantities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub packaging: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub score: Score,
    /// Barcode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<AssetId>,
    #[serde(default)]
    pub contained_products: Vec<AssetId>,
    #[serde(default)]
    pub labels: Vec<AssetId>,
    #[serde(default)]
    pub locales: Vec<ProductLocale>,
}

impl Validate for Product {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(gtin) = &self.gtin {
            if gtin.is_empty() || !gtin.chars().all(|c| c.is_ascii_digit()) {
                return Err(ValidationError::invalid(
                    "gtin",
                    format!("'{gtin}' is not a numeric barcode"),
                ));
            }
        }
        if let Some(producer) = &self.producer {
            validate::require("producer", producer.as_str())?;
        }
        validate::id_list("containedProducts", &self.contained_products)?;
        validate::id_list("labels", &self.labels)?;
        validate::unique_langs("locales", self.locales.iter().map(|l| l.lang.as_str()))?;
        for locale in &self.locales {
            validate::require("locales.name", &locale.name)?;
            validate::optional_url("locales.url", locale.url.as_deref())?;
        }
        Ok(())
    }
}

/// The party bringing a product to market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    #[serde(default)]
    pub score: Score,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub labels: Vec<AssetId>,
}

impl Validate for Producer {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::require("name", &self.name)?;
        validate::optional_url("url", self.url.as_deref())?;
        validate::id_list("labels", &self.labels)
    }
}

/// Language-specific part of a label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelLocale {
    pub lang: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// A sustainability label such as "Organic" or "Fairtrade".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    #[serde(default)]
    pub score: Score,
    #[serde(default)]
    pub locales: Vec<LabelLocale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Validate for Label {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::require_any("locales", &self.locales)?;
        validate::unique_langs("locales", self.locales.iter().map(|l| l.lang.as_str()))?;
        for locale in &self.locales {
            validate::require("locales.name", &locale.name)?;
            validate::optional_url("locales.url", locale.url.as_deref())?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InfoCategory {
    GeneralInformation,
    LifeCycleAnalysis,
    ExternalCosts,
    StudyOrPaper,
    PressArticle,
    InvestigativeReport,
    CorporateSocialResponsibility,
    Jurisdiction,
    Other,
}

impl InfoCategory {
    /// Wire order; the 1-based position is the numeric category code.
    pub const ALL: [InfoCategory; 9] = [
        InfoCategory::GeneralInformation,
        InfoCategory::LifeCycleAnalysis,
        InfoCategory::ExternalCosts,
        InfoCategory::StudyOrPaper,
        InfoCategory::PressArticle,
        InfoCategory::InvestigativeReport,
        InfoCategory::CorporateSocialResponsibility,
        InfoCategory::Jurisdiction,
        InfoCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InfoCategory::GeneralInformation => "generalInformation",
            InfoCategory::LifeCycleAnalysis => "lifeCycleAnalysis",
            InfoCategory::ExternalCosts => "externalCosts",
            InfoCategory::StudyOrPaper => "studyOrPaper",
            InfoCategory::PressArticle => "pressArticle",
            InfoCategory::InvestigativeReport => "investigativeReport",
            InfoCategory::CorporateSocialResponsibility => "corporateSocialResponsibility",
            InfoCategory::Jurisdiction => "jurisdiction",
            InfoCategory::Other => "other",
        }
    }
}

impl fmt::Display for InfoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InfoCategory {
    type Err = ValidationError;

    /// Accepts the camelCase name or the numeric code `1..=9`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<usize>() {
            return code
                .checked_sub(1)
                .and_then(|index| InfoCategory::ALL.get(index).copied())
                .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()));
        }
        InfoCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// Evidence about a scorable asset. Updatable, not scorable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Information {
    pub title: String,
    pub category: InfoCategory,
    /// Id of the scorable asset version this record is evidence for.
    pub target: AssetId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Signed magnitude of evidentiary influence.
    pub weight: i32,
}

impl Validate for Information {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::require("title", &self.title)?;
        validate::require("target", self.target.as_str())?;
        for source in &self.sources {
            source.validate()?;
        }
        Ok(())
    }
}
