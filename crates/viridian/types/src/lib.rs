//! Viridian Types - the asset model shared by every registry component.
//!
//! Assets are composed rather than inherited: every persisted record carries a
//! [`Reviewable`] header and an [`Updatable`] revision block, and the concrete
//! payload lives in the [`AssetKind`] variant selected by its `docType`.
//! Scorable kinds (products, producers, labels) carry a [`Score`] inside their
//! payload; information records do not.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod asset;
mod ids;
mod score;
mod source;
mod status;
mod validate;

pub use asset::{
    Asset, AssetKind, InfoCategory, Information, Label, LabelLocale, Producer, Product,
    ProductLocale, Reviewable, Updatable,
};
pub use ids::{AssetId, DocType, Identity};
pub use score::{Dimension, Score, DIMENSIONS, SCORE_MAX, SCORE_MIN};
pub use source::{ArticleSource, BookSource, Source, WebSource};
pub use status::{AssetStatus, ReviewOutcome};
pub use validate::{Validate, ValidationError};
