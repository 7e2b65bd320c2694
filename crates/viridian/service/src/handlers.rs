//! Operation handlers: decode positional arguments, call the registry, encode the result.

use crate::args::Args;
use crate::router::Operation;
use futures::future::BoxFuture;
use serde_json::Value;
use viridian_engine::{Registry, RegistryResult};
use viridian_identity::CallContext;
use viridian_types::{
    AssetKind, DocType, InfoCategory, Information, Label, LabelLocale, Producer, Product,
    ProductLocale, ReviewOutcome, Score, Source,
};

pub(crate) fn operations() -> Vec<Operation> {
    vec![
        Operation {
            name: "createProducer",
            params: &["id", "name", "address", "url", "labels"],
            mutating: true,
            handler: create_producer,
        },
        Operation {
            name: "createProduct",
            params: &["id", "gtin", "producer", "containedProducts", "labels", "locales"],
            mutating: true,
            handler: create_product,
        },
        Operation {
            name: "createLabel",
            params: &["id", "locales", "version"],
            mutating: true,
            handler: create_label,
        },
        Operation {
            name: "createInformation",
            params: &["id", "target", "category", "title", "description", "weight", "sources"],
            mutating: true,
            handler: create_information,
        },
        Operation {
            name: "updateAsset",
            params: &["predecessorId", "newFields", "changeReason"],
            mutating: true,
            handler: update_asset,
        },
        Operation {
            name: "applyReviewOutcome",
            params: &["assetId", "outcome"],
            mutating: true,
            handler: apply_review_outcome,
        },
        Operation {
            name: "findByAttribute",
            params: &["docType", "field", "value"],
            mutating: false,
            handler: find_by_attribute,
        },
        Operation {
            name: "queryProductsByGtin",
            params: &["gtin"],
            mutating: false,
            handler: query_products_by_gtin,
        },
        Operation {
            name: "getAsset",
            params: &["id"],
            mutating: false,
            handler: get_asset,
        },
        Operation {
            name: "getLineage",
            params: &["id"],
            mutating: false,
            handler: get_lineage,
        },
        Operation {
            name: "getLatest",
            params: &["id"],
            mutating: false,
            handler: get_latest,
        },
        Operation {
            name: "getHistory",
            params: &["id"],
            mutating: false,
            handler: get_history,
        },
    ]
}

fn create_producer<'a>(
    registry: &'a Registry,
    context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let id = args.optional_id("id")?;
        let kind = AssetKind::Producer(Producer {
            score: Score::ZERO,
            name: args.raw("name")?.to_string(),
            address: args.optional("address")?,
            url: args.optional("url")?,
            labels: args.json_list("labels")?,
        });
        let asset = registry.create_asset(context, id, kind).await?;
        Ok(serde_json::to_value(asset)?)
    })
}

fn create_product<'a>(
    registry: &'a Registry,
    context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let id = args.optional_id("id")?;
        let locales: Vec<ProductLocale> = args.json_list("locales")?;
        let kind = AssetKind::Product(Product {
            score: Score::ZERO,
            gtin: args.optional("gtin")?,
            producer: args.optional_id("producer")?,
            contained_products: args.json_list("containedProducts")?,
            labels: args.json_list("labels")?,
            locales,
        });
        let asset = registry.create_asset(context, id, kind).await?;
        Ok(serde_json::to_value(asset)?)
    })
}

fn create_label<'a>(
    registry: &'a Registry,
    context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let id = args.optional_id("id")?;
        let locales: Vec<LabelLocale> = args.json_list("locales")?;
        let kind = AssetKind::Label(Label {
            score: Score::ZERO,
            locales,
            version: args.optional("version")?,
        });
        let asset = registry.create_asset(context, id, kind).await?;
        Ok(serde_json::to_value(asset)?)
    })
}

fn create_information<'a>(
    registry: &'a Registry,
    context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let id = args.optional_id("id")?;
        let sources: Vec<Source> = args.json_list("sources")?;
        let kind = AssetKind::Information(Information {
            title: args.raw("title")?.to_string(),
            category: args.parse::<InfoCategory>("category")?,
            target: args.id("target")?,
            description: args.raw("description")?.to_string(),
            sources,
            weight: args.parse("weight")?,
        });
        let asset = registry.create_asset(context, id, kind).await?;
        Ok(serde_json::to_value(asset)?)
    })
}

fn update_asset<'a>(
    registry: &'a Registry,
    context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let predecessor = args.id("predecessorId")?;
        let new_fields: Value = args.json("newFields")?;
        let asset = registry
            .create_update(context, &predecessor, &new_fields, args.raw("changeReason")?)
            .await?;
        Ok(serde_json::to_value(asset)?)
    })
}

fn apply_review_outcome<'a>(
    registry: &'a Registry,
    context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let id = args.id("assetId")?;
        let outcome: ReviewOutcome = args.parse("outcome")?;
        let report = registry.apply_review_outcome(context, &id, outcome).await?;
        Ok(serde_json::to_value(report)?)
    })
}

fn find_by_attribute<'a>(
    registry: &'a Registry,
    _context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let doc_type: DocType = args.parse("docType")?;
        let hits = registry
            .find_by_attribute(doc_type, args.raw("field")?, args.raw("value")?)
            .await?;
        Ok(serde_json::to_value(hits)?)
    })
}

fn query_products_by_gtin<'a>(
    registry: &'a Registry,
    _context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let hits = registry.products_by_gtin(args.required("gtin")?).await?;
        Ok(serde_json::to_value(hits)?)
    })
}

fn get_asset<'a>(
    registry: &'a Registry,
    _context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let asset = registry.get_asset(&args.id("id")?).await?;
        Ok(serde_json::to_value(asset)?)
    })
}

fn get_lineage<'a>(
    registry: &'a Registry,
    _context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let lineage = registry.lineage(&args.id("id")?).await?;
        Ok(serde_json::to_value(lineage)?)
    })
}

fn get_latest<'a>(
    registry: &'a Registry,
    _context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let latest = registry.latest(&args.id("id")?).await?;
        Ok(serde_json::to_value(latest)?)
    })
}

fn get_history<'a>(
    registry: &'a Registry,
    _context: &'a CallContext,
    args: Args<'a>,
) -> BoxFuture<'a, RegistryResult<Value>> {
    Box::pin(async move {
        let history = registry.history(&args.id("id")?).await?;
        Ok(serde_json::to_value(history)?)
    })
}
