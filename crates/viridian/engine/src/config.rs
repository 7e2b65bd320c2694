use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use viridian_types::{Dimension, InfoCategory, ValidationError, DIMENSIONS};

/// Engine behavior knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject updates without a change reason.
    pub require_change_reason: bool,
    /// Upper bound on versions visited by any lineage walk.
    pub max_lineage_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_change_reason: true,
            max_lineage_depth: 1024,
        }
    }
}

/// Percent of an information weight credited to each dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFactors {
    pub environment: i64,
    pub climate: i64,
    pub society: i64,
    pub health: i64,
    pub economy: i64,
}

impl CategoryFactors {
    pub const fn new(
        environment: i64,
        climate: i64,
        society: i64,
        health: i64,
        economy: i64,
    ) -> Self {
        Self {
            environment,
            climate,
            society,
            health,
            economy,
        }
    }

    pub const fn uniform(factor: i64) -> Self {
        Self::new(factor, factor, factor, factor, factor)
    }

    pub fn get(&self, dimension: Dimension) -> i64 {
        self.to_array()[dimension.index()]
    }

    pub fn to_array(&self) -> [i64; DIMENSIONS] {
        [
            self.environment,
            self.climate,
            self.society,
            self.health,
            self.economy,
        ]
    }
}

impl Default for CategoryFactors {
    fn default() -> Self {
        Self::uniform(0)
    }
}

/// Built-in factor table.
pub fn default_factors(category: InfoCategory) -> CategoryFactors {
    match category {
        InfoCategory::GeneralInformation => CategoryFactors::uniform(50),
        InfoCategory::LifeCycleAnalysis => CategoryFactors::new(100, 100, 25, 25, 25),
        InfoCategory::ExternalCosts => CategoryFactors::new(75, 75, 50, 25, 100),
        InfoCategory::StudyOrPaper => CategoryFactors::uniform(100),
        InfoCategory::PressArticle => CategoryFactors::uniform(25),
        InfoCategory::InvestigativeReport => CategoryFactors::uniform(75),
        InfoCategory::CorporateSocialResponsibility => CategoryFactors::new(25, 25, 75, 25, 25),
        InfoCategory::Jurisdiction => CategoryFactors::uniform(50),
        InfoCategory::Other => CategoryFactors::uniform(25),
    }
}

/// Per-category factors of the default scoring policy, keyed by category name.
///
/// Categories missing from a configured table fall back to the built-in row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub categories: BTreeMap<String, CategoryFactors>,
}

impl ScoringConfig {
    pub fn factors(&self, category: InfoCategory) -> CategoryFactors {
        self.categories
            .get(category.as_str())
            .copied()
            .unwrap_or_else(|| default_factors(category))
    }

    /// Reject table keys that name no category.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in self.categories.keys() {
            if !InfoCategory::ALL.iter().any(|c| c.as_str() == name) {
                return Err(ValidationError::UnknownCategory(name.clone()));
            }
        }
        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            categories: InfoCategory::ALL
                .into_iter()
                .map(|category| (category.as_str().to_string(), default_factors(category)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_every_category() {
        let config = ScoringConfig::default();
        assert_eq!(config.categories.len(), InfoCategory::ALL.len());
        assert_eq!(
            config.factors(InfoCategory::LifeCycleAnalysis).get(Dimension::Climate),
            100
        );
    }

    #[test]
    fn partial_table_falls_back_to_builtin_rows() {
        let config: ScoringConfig = serde_json::from_str(
            r#"{"categories": {"pressArticle": {"environment": 10, "climate": 10}}}"#,
        )
        .unwrap();
        let press = config.factors(InfoCategory::PressArticle);
        assert_eq!(press.environment, 10);
        assert_eq!(press.society, 0);
        assert_eq!(
            config.factors(InfoCategory::StudyOrPaper),
            CategoryFactors::uniform(100)
        );
    }

    #[test]
    fn unknown_category_names_are_rejected() {
        let mut config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        config
            .categories
            .insert("rumour".to_string(), CategoryFactors::uniform(1));
        assert!(matches!(
            config.validate(),
            Err(ValidationError::UnknownCategory(_))
        ));
    }

    #[test]
    fn engine_defaults_require_change_reason() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert!(config.require_change_reason);
        assert_eq!(config.max_lineage_depth, 1024);
    }
}
