//! Field rules for client-supplied asset data.

use crate::ids::AssetId;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

static LANG_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}$").expect("valid regex"));
static URL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+://[^ ]+$").expect("valid regex"));

/// Rejection of a malformed field or structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: String },

    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("duplicate locale for language {0}")]
    DuplicateLocale(String),

    #[error("unknown docType: {0}")]
    UnknownDocType(String),

    #[error("unknown information category: {0}")]
    UnknownCategory(String),

    #[error("unknown review outcome: {0}")]
    UnknownOutcome(String),
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Structural validation of client-supplied data.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_any<T>(field: &str, values: &[T]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::Missing {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// ISO 639-1 language code.
pub(crate) fn lang(field: &str, value: &str) -> Result<(), ValidationError> {
    if !LANG_RULE.is_match(value) {
        return Err(ValidationError::invalid(
            field,
            format!("'{value}' is not a two-letter lowercase language code"),
        ));
    }
    Ok(())
}

pub(crate) fn url(field: &str, value: &str) -> Result<(), ValidationError> {
    if !URL_RULE.is_match(value) {
        return Err(ValidationError::invalid(
            field,
            format!("'{value}' is not a url"),
        ));
    }
    Ok(())
}

pub(crate) fn optional_url(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(value) if !value.is_empty() => url(field, value),
        _ => Ok(()),
    }
}

/// Id lists: no blank entries, no repeats.
pub(crate) fn id_list(field: &str, ids: &[AssetId]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::invalid(field, "contains an empty id"));
        }
        if !seen.insert(id) {
            return Err(ValidationError::invalid(
                field,
                format!("lists {id} more than once"),
            ));
        }
    }
    Ok(())
}

/// One locale record per language.
pub(crate) fn unique_langs<'a>(
    field: &str,
    langs: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for code in langs {
        lang(&format!("{field}.lang"), code)?;
        if !seen.insert(code) {
            return Err(ValidationError::DuplicateLocale(code.to_string()));
        }
    }
    Ok(())
}
