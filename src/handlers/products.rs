//! Product CRUD. Reads are public; writes are admin-only. A product must
//! reference an existing product type.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::context::AppContext;
use crate::handlers::{merge_field, require_id};
use crate::http::response::Reply;
use crate::http::router::{HandlerFuture, RequestContext};
use crate::models::product;
use crate::validate::Validator;

/// GET /products (guest).
pub fn index(ctx: Arc<AppContext>, _req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let rows = ctx.products().all().await?;
        Ok(Reply::ok(json!(rows)))
    })
}

/// GET /product?id= (guest).
pub fn show(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let row = ctx.products().get(id).await?;
        Ok(Reply::ok(Value::Object(row)))
    })
}

/// POST /product/store (admin).
pub fn store(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        Validator::check(product::RULES, &req.params).ok_or_fail()?;

        // The referenced type must exist; a dangling id fails the lookup.
        let type_id = req.params["type_id"].as_i64().unwrap_or(0);
        ctx.product_types().get(type_id).await?;

        let mut values = serde_json::Map::new();
        for key in ["name", "description", "value", "type_id"] {
            values.insert(key.to_string(), req.params.get(key).cloned().unwrap_or(Value::Null));
        }

        let row = ctx.products().save(&values).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// PUT /product/update (admin): partial merge over the stored record.
pub fn update(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let products = ctx.products();
        let existing = products.get(id).await?;

        let mut merged = serde_json::Map::new();
        for key in ["name", "description", "value", "type_id"] {
            merged.insert(key.to_string(), merge_field(&req.params, &existing, key));
        }

        Validator::check(product::RULES, &merged).ok_or_fail()?;

        let type_id = merged["type_id"].as_i64().unwrap_or(0);
        ctx.product_types().get(type_id).await?;

        let row = products.save_or_update(id, &merged).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// DELETE /product/delete (admin).
pub fn delete(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let products = ctx.products();
        products.get(id).await?;
        products.delete(id).await?;
        Ok(Reply::ok(json!("Product deleted")))
    })
}
