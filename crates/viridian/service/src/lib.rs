//! Viridian Service - named operation dispatch over the registry engine.
//!
//! The transport hands over an operation name, a flat list of string
//! arguments and the caller's context. The service looks the name up in a
//! table built once, validates arity and argument encoding before anything
//! is staged, runs the handler and returns either a JSON payload or an
//! [`OperationFailure`] carrying `{kind, message}`.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod args;
pub mod config;
mod handlers;
mod response;
pub mod router;
pub mod telemetry;

pub use args::Args;
pub use config::{ConfigError, LoggingConfig, ServiceConfig};
pub use response::OperationFailure;
pub use router::{Handler, Operation, OperationRouter};

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use viridian_engine::{CategoryWeightedPolicy, Registry};
use viridian_identity::{CallContext, IdentityProvider};
use viridian_storage::RegistryStorage;

/// Registry engine plus its dispatch table.
pub struct RegistryService {
    registry: Registry,
    router: OperationRouter,
}

impl RegistryService {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            router: OperationRouter::new(),
        }
    }

    /// Build the engine from configuration with the default scoring policy.
    pub fn from_config(
        config: &ServiceConfig,
        storage: Arc<dyn RegistryStorage>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let registry = Registry::new(storage, identity)
            .with_config(config.engine.clone())
            .with_policy(Arc::new(CategoryWeightedPolicy::new(config.scoring.clone())));
        Self::new(registry)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn router(&self) -> &OperationRouter {
        &self.router
    }

    /// Run one named operation.
    pub async fn invoke(
        &self,
        context: &CallContext,
        operation: &str,
        args: &[String],
    ) -> Result<Value, OperationFailure> {
        debug!(operation, args = args.len(), "dispatching");
        match self
            .router
            .dispatch(&self.registry, context, operation, args)
            .await
        {
            Ok(payload) => Ok(payload),
            Err(err) => {
                let failure = OperationFailure::from(err);
                warn!(
                    operation,
                    kind = %failure.kind,
                    message = %failure.message,
                    "operation failed"
                );
                Err(failure)
            }
        }
    }
}
