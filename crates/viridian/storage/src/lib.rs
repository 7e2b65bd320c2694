//! Viridian ledger contracts.
//!
//! The registry core never owns storage. It consumes:
//! - a transactional key/value ledger with optimistic conflict detection
//! - a selector query engine without transactional guarantees
//! - per-key modification history for audit reads
//!
//! [`memory::InMemoryLedger`] implements all three for tests and local runs.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use model::{CommitReceipt, KeyModification, KeyValue, Selector};
pub use traits::{
    KeyValueLedger, LedgerHistory, LedgerTransaction, RegistryStorage, SelectorQueryEngine,
};
