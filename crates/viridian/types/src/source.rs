use crate::validate::{self, Validate, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Citation backing an information record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
    Web(WebSource),
    Book(BookSource),
    Article(ArticleSource),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSource {
    pub url: String,
    pub access_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSource {
    pub title: String,
    pub authors: Vec<String>,
    pub publish_year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default)]
    pub pages: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSource {
    pub title: String,
    pub authors: Vec<String>,
    pub journal: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl Validate for Source {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Source::Web(web) => {
                validate::require("source.url", &web.url)?;
                validate::url("source.url", &web.url)
            }
            Source::Book(book) => {
                validate::require("source.title", &book.title)?;
                validate::require_any("source.authors", &book.authors)?;
                if book.pages.contains(&0) {
                    return Err(ValidationError::invalid(
                        "source.pages",
                        "page numbers start at 1",
                    ));
                }
                validate::optional_url("source.url", book.url.as_deref())
            }
            Source::Article(article) => {
                validate::require("source.title", &article.title)?;
                validate::require_any("source.authors", &article.authors)?;
                validate::require("source.journal", &article.journal)?;
                if let Some(month) = article.month {
                    if !(1..=12).contains(&month) {
                        return Err(ValidationError::invalid(
                            "source.month",
                            format!("{month} is not in 1..=12"),
                        ));
                    }
                }
                if let (Some(first), Some(last)) = (article.first_page, article.last_page) {
                    if first > last {
                        return Err(ValidationError::invalid(
                            "source.firstPage",
                            format!("first page {first} is after last page {last}"),
                        ));
                    }
                }
                validate::optional_url("source.url", article.url.as_deref())
            }
        }
    }
}
