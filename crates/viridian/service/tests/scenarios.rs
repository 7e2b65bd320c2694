//! End-to-end scenarios through the operation table.

use serde_json::{json, Value};
use std::sync::Arc;
use viridian_engine::ErrorKind;
use viridian_identity::{CallContext, MemberRegistry, RegistrationRequest};
use viridian_service::{OperationFailure, RegistryService, ServiceConfig};
use viridian_storage::memory::InMemoryLedger;
use viridian_types::{AssetId, AssetKind, InfoCategory, Information};

struct Harness {
    service: RegistryService,
    ledger: InMemoryLedger,
    member: CallContext,
}

fn harness() -> Harness {
    let ledger = InMemoryLedger::new();
    let members = MemberRegistry::new();
    members
        .register_with_credential(RegistrationRequest::new("alice"), "alice-token")
        .unwrap();
    let service = RegistryService::from_config(
        &ServiceConfig::default(),
        Arc::new(ledger.clone()),
        Arc::new(members),
    );
    Harness {
        service,
        ledger,
        member: CallContext::with_credential("alice-token"),
    }
}

impl Harness {
    async fn call(&self, operation: &str, args: &[&str]) -> Result<Value, OperationFailure> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.service.invoke(&self.member, operation, &args).await
    }

    async fn ok(&self, operation: &str, args: &[&str]) -> Value {
        match self.call(operation, args).await {
            Ok(value) => value,
            Err(failure) => panic!("{operation} failed: {failure}"),
        }
    }

    async fn fails(&self, operation: &str, args: &[&str]) -> ErrorKind {
        match self.call(operation, args).await {
            Ok(value) => panic!("{operation} unexpectedly succeeded: {value}"),
            Err(failure) => failure.kind,
        }
    }

    async fn approve(&self, id: &str) -> Value {
        self.ok("applyReviewOutcome", &[id, "approve"]).await
    }

    async fn commits(&self) -> usize {
        self.ledger.commits().await.len()
    }
}

fn id_of(asset: &Value) -> String {
    asset["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn containment_cycles_are_rejected() {
    let h = harness();
    h.ok("createProducer", &["pr-1", "Wander AG", "Bern", "https://wander.ch", "[]"])
        .await;
    h.approve("pr-1").await;
    let a = h.ok("createProduct", &["A", "", "pr-1", "[]", "[]", "[]"]).await;
    assert_eq!(a["status"], "preliminary");
    assert_eq!(a["producer"], "pr-1");
    h.approve("A").await;

    let err = h
        .service
        .registry()
        .validate_containment(&AssetId::new("A"), &[AssetId::new("A")])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicContainment);

    h.ok("createProduct", &["B", "", "pr-1", r#"["A"]"#, "[]", "[]"])
        .await;
    let kind = h
        .fails(
            "updateAsset",
            &["A", r#"{"containedProducts": ["B"]}"#, "bundle with B"],
        )
        .await;
    assert_eq!(kind, ErrorKind::CyclicContainment);
}

#[tokio::test]
async fn rejected_products_cannot_be_updated() {
    let h = harness();
    h.ok("createProduct", &["A", "", "", "[]", "[]", "[]"]).await;
    let report = h.ok("applyReviewOutcome", &["A", "reject"]).await;
    assert_eq!(report["asset"]["status"], "rejected");

    let kind = h
        .fails("updateAsset", &["A", r#"{"labels": []}"#, "retry"])
        .await;
    assert_eq!(kind, ErrorKind::InvalidPredecessorState);
}

#[tokio::test]
async fn concurrent_information_on_one_target_conflicts() {
    let h = harness();
    let target = h.ok("createProduct", &["T", "", "", "[]", "[]", "[]"]).await;
    let target = AssetId::new(id_of(&target));
    let registry = h.service.registry();
    let caller = registry.resolve_caller(&h.member).unwrap();

    let info = |weight| {
        AssetKind::Information(Information {
            title: "Palm oil sourcing".to_string(),
            category: InfoCategory::InvestigativeReport,
            target: target.clone(),
            description: String::new(),
            sources: vec![],
            weight,
        })
    };

    let mut first = registry.begin().await.unwrap();
    let mut second = registry.begin().await.unwrap();
    registry
        .stage_create(&mut first, &caller, None, info(-30))
        .await
        .unwrap();
    registry
        .stage_create(&mut second, &caller, None, info(-50))
        .await
        .unwrap();

    registry.commit(first).await.unwrap();
    let err = registry.commit(second).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConflictAborted);
}

#[tokio::test]
async fn duplicate_barcodes_are_rejected() {
    let h = harness();
    h.ok("createProduct", &["", "7612100055557", "", "[]", "[]", "[]"])
        .await;
    let kind = h
        .fails("createProduct", &["", "7612100055557", "", "[]", "[]", "[]"])
        .await;
    assert_eq!(kind, ErrorKind::InvalidArgument);

    let hits = h.ok("queryProductsByGtin", &["7612100055557"]).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["asset"]["gtin"], "7612100055557");
}

#[tokio::test]
async fn malformed_calls_write_nothing() {
    let h = harness();
    let before = h.commits().await;

    let kind = h
        .fails("createProducer", &["", "Wander AG", "", ""])
        .await;
    assert_eq!(kind, ErrorKind::InvalidArgument);

    let kind = h
        .fails("createProduct", &["", "", "", "[]", "[not json", "[]"])
        .await;
    assert_eq!(kind, ErrorKind::InvalidArgument);

    let kind = h
        .fails("createInformation", &["", "x", "gossip", "t", "", "1", "[]"])
        .await;
    assert_eq!(kind, ErrorKind::InvalidArgument);

    let kind = h
        .fails(
            "createLabel",
            &["", r#"[{"lang": "english", "name": "Organic"}]"#, ""],
        )
        .await;
    assert_eq!(kind, ErrorKind::InvalidArgument);

    assert_eq!(h.commits().await, before);
}

#[tokio::test]
async fn unknown_operations_are_rejected() {
    let h = harness();
    assert_eq!(
        h.fails("deleteEverything", &[]).await,
        ErrorKind::InvalidArgument
    );
}

#[tokio::test]
async fn anonymous_callers_may_read_but_not_write() {
    let h = harness();
    let label = h
        .ok("createLabel", &["l-1", r#"[{"lang": "en", "name": "Organic"}]"#, "2019"])
        .await;
    assert_eq!(label["docType"], "label");

    let anonymous = CallContext::anonymous();
    let args = vec![
        String::new(),
        r#"[{"lang": "de", "name": "Bio"}]"#.to_string(),
        String::new(),
    ];
    let failure = h
        .service
        .invoke(&anonymous, "createLabel", &args)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ErrorKind::AccessDenied);

    let read = h
        .service
        .invoke(&anonymous, "getAsset", &["l-1".to_string()])
        .await
        .unwrap();
    assert_eq!(read["id"], "l-1");
}

#[tokio::test]
async fn approved_update_outdates_predecessor() {
    let h = harness();
    h.ok("createProducer", &["pr-1", "Wander AG", "", "", "[]"]).await;
    h.approve("pr-1").await;
    let v2 = h
        .ok("updateAsset", &["pr-1", r#"{"address": "Neuenegg"}"#, "moved"])
        .await;
    assert_eq!(v2["supersedes"], "pr-1");
    assert_eq!(v2["changeReason"], "moved");
    assert_eq!(v2["status"], "preliminary");

    let report = h.approve(v2["id"].as_str().unwrap()).await;
    assert_eq!(report["outdated"], "pr-1");

    let lineage = h.ok("getLineage", &["pr-1"]).await;
    let statuses: Vec<&str> = lineage
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["outdated", "active"]);
    assert_eq!(lineage[1]["address"], "Neuenegg");

    let latest = h.ok("getLatest", &["pr-1"]).await;
    assert_eq!(latest["id"], v2["id"]);
    assert_eq!(latest["status"], "active");

    let history = h.ok("getHistory", &["pr-1"]).await;
    assert_eq!(history.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn approved_evidence_moves_the_score_within_bounds() {
    let h = harness();
    h.ok("createProduct", &["T", "", "", "[]", "[]", "[]"]).await;
    let sources = json!([{
        "kind": "web",
        "url": "https://example.org/lca",
        "accessDate": "2019-03-17T22:45:35Z"
    }])
    .to_string();
    let info = h
        .ok(
            "createInformation",
            &["", "T", "2", "LCA", "cradle to gate", "40", &sources],
        )
        .await;
    assert_eq!(info["category"], "lifeCycleAnalysis");
    h.approve(&id_of(&info)).await;

    let target = h.ok("getAsset", &["T"]).await;
    assert_eq!(target["score"]["environment"], 40);
    assert_eq!(target["score"]["society"], 10);

    let heavy = h
        .ok("createInformation", &["", "T", "studyOrPaper", "Meta study", "", "500", "[]"])
        .await;
    h.approve(&id_of(&heavy)).await;
    let target = h.ok("getAsset", &["T"]).await;
    assert_eq!(target["score"]["environment"], 100);
    assert_eq!(target["score"]["economy"], 100);
}

#[tokio::test]
async fn attribute_queries_validate_their_inputs() {
    let h = harness();
    h.ok("createProducer", &["", "Wander AG", "", "", "[]"]).await;
    let hits = h.ok("findByAttribute", &["producer", "name", "Wander AG"]).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert!(hits[0]["key"].as_str().unwrap().starts_with("producer-"));

    assert_eq!(
        h.fails("findByAttribute", &["producer", "docType", "label"]).await,
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        h.fails("findByAttribute", &["widget", "name", "x"]).await,
        ErrorKind::InvalidArgument
    );
}

#[tokio::test]
async fn ids_are_never_reused_across_kinds() {
    let h = harness();
    h.ok("createProducer", &["shared", "Wander AG", "", "", "[]"]).await;
    assert_eq!(
        h.fails(
            "createLabel",
            &["shared", r#"[{"lang": "en", "name": "Organic"}]"#, ""],
        )
        .await,
        ErrorKind::InvalidArgument
    );
}

#[tokio::test]
async fn missing_assets_are_not_found() {
    let h = harness();
    assert_eq!(h.fails("getAsset", &["ghost"]).await, ErrorKind::NotFound);
    assert_eq!(
        h.fails("applyReviewOutcome", &["ghost", "approve"]).await,
        ErrorKind::NotFound
    );
    assert_eq!(
        h.fails("applyReviewOutcome", &["ghost", "maybe"]).await,
        ErrorKind::InvalidArgument
    );
}
