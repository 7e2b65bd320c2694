//! Viridian Engine - the review and versioning core of the registry.
//!
//! Every mutating call runs inside one ledger transaction:
//! 1. the caller is resolved through the identity gate
//! 2. client data is validated and its references resolved
//! 3. the lifecycle state machine assigns the next status
//! 4. supersession links, containment edges, barcode claims and evidence
//!    indexes are staged
//! 5. the transaction commits, or aborts as a whole on a stale read
//!
//! Selector queries are served outside transactions and never back an
//! invariant.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod chain;
pub mod claims;
mod config;
pub mod containment;
mod error;
pub mod lifecycle;
pub mod query;
mod registry;
pub mod scoring;
mod store;

pub use config::{default_factors, CategoryFactors, EngineConfig, ScoringConfig};
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use query::QueryHit;
pub use registry::{HistoryEntry, Registry, ReviewReport};
pub use scoring::{CategoryWeightedPolicy, EvidenceIndex, ScoreAggregator, ScorePolicy};
pub use store::AssetTx;
