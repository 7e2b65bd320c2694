use crate::args::Args;
use crate::handlers;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use viridian_engine::{Registry, RegistryError, RegistryResult};
use viridian_identity::CallContext;

/// Async handler of one named operation.
pub type Handler =
    for<'a> fn(&'a Registry, &'a CallContext, Args<'a>) -> BoxFuture<'a, RegistryResult<Value>>;

/// One dispatchable operation.
#[derive(Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    /// Positional parameter names, in argument order.
    pub params: &'static [&'static str],
    pub mutating: bool,
    pub handler: Handler,
}

/// Name to handler table, built once per service.
pub struct OperationRouter {
    operations: HashMap<&'static str, Operation>,
}

impl OperationRouter {
    pub fn new() -> Self {
        Self {
            operations: handlers::operations()
                .into_iter()
                .map(|op| (op.name, op))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Operation names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.operations.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Gate writes on a resolvable caller, validate arity, then run the handler.
    pub async fn dispatch(
        &self,
        registry: &Registry,
        context: &CallContext,
        name: &str,
        values: &[String],
    ) -> RegistryResult<Value> {
        let operation = self
            .get(name)
            .ok_or_else(|| RegistryError::InvalidArgument(format!("unknown operation {name}")))?;
        if operation.mutating {
            registry.resolve_caller(context)?;
        }
        let args = Args::new(operation.name, operation.params, values)?;
        (operation.handler)(registry, context, args).await
    }
}

impl Default for OperationRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use viridian_engine::ErrorKind;
    use viridian_identity::MemberRegistry;
    use viridian_storage::memory::InMemoryLedger;

    #[test]
    fn table_lists_every_operation() {
        assert_eq!(
            OperationRouter::new().names(),
            vec![
                "applyReviewOutcome",
                "createInformation",
                "createLabel",
                "createProducer",
                "createProduct",
                "findByAttribute",
                "getAsset",
                "getHistory",
                "getLatest",
                "getLineage",
                "queryProductsByGtin",
                "updateAsset",
            ]
        );
    }

    #[test]
    fn reads_are_not_mutating() {
        let router = OperationRouter::new();
        for name in [
            "getAsset",
            "getLatest",
            "getLineage",
            "getHistory",
            "findByAttribute",
            "queryProductsByGtin",
        ] {
            assert!(!router.get(name).unwrap().mutating, "{name}");
        }
        assert!(router.get("updateAsset").unwrap().mutating);
    }

    fn registry() -> Registry {
        Registry::new(
            Arc::new(InMemoryLedger::new()),
            Arc::new(MemberRegistry::new()),
        )
    }

    #[tokio::test]
    async fn writes_check_the_caller_before_their_arguments() {
        let router = OperationRouter::new();
        let registry = registry();
        let anonymous = CallContext::anonymous();

        let err = router
            .dispatch(&registry, &anonymous, "createLabel", &[String::new()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);

        let err = router
            .dispatch(&registry, &anonymous, "getAsset", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
