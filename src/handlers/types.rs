//! Product type CRUD. Reads are public; writes are admin-only and the type
//! name is unique across the table.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::context::AppContext;
use crate::handlers::{merge_field, require_id};
use crate::http::response::Reply;
use crate::http::router::{HandlerFuture, RequestContext};
use crate::models::product_type;
use crate::validate::Validator;

/// GET /types (guest).
pub fn index(ctx: Arc<AppContext>, _req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let rows = ctx.product_types().all().await?;
        Ok(Reply::ok(json!(rows)))
    })
}

/// GET /type?id= (guest).
pub fn show(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let row = ctx.product_types().get(id).await?;
        Ok(Reply::ok(Value::Object(row)))
    })
}

/// POST /type/store (admin).
pub fn store(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let types = ctx.product_types();
        let mut validator = Validator::check(product_type::RULES, &req.params);
        if let Some(name) = req.params.get("name").filter(|v| v.is_string()) {
            if !types.is_unique("name", name, None).await? {
                validator.add_unique_violation("name");
            }
        }
        validator.ok_or_fail()?;

        let mut values = serde_json::Map::new();
        values.insert("name".to_string(), req.params["name"].clone());
        values.insert("tax".to_string(), req.params["tax"].clone());

        let row = types.save(&values).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// PUT /type/update (admin): partial merge, then the same validation as a
/// store with the record's own row excluded from the uniqueness probe.
pub fn update(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let types = ctx.product_types();
        let existing = types.get(id).await?;

        let mut merged = serde_json::Map::new();
        merged.insert("name".to_string(), merge_field(&req.params, &existing, "name"));
        merged.insert("tax".to_string(), merge_field(&req.params, &existing, "tax"));

        let mut validator = Validator::check(product_type::RULES, &merged);
        if !types.is_unique("name", &merged["name"], Some(id)).await? {
            validator.add_unique_violation("name");
        }
        validator.ok_or_fail()?;

        let row = types.save_or_update(id, &merged).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// DELETE /type/delete (admin).
pub fn delete(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let types = ctx.product_types();
        types.get(id).await?;
        types.delete(id).await?;
        Ok(Reply::ok(json!("Type deleted")))
    })
}
