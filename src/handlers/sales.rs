//! Sale CRUD. Any signed-in user can record or read a sale; the wider list
//! and all mutations of existing sales are admin territory. A sale must
//! reference an existing user and carries its cart as a JSON column.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::context::AppContext;
use crate::handlers::{merge_field, require_id};
use crate::http::response::Reply;
use crate::http::router::{HandlerFuture, RequestContext};
use crate::models::sale;
use crate::validate::Validator;

/// GET /sales (admin).
pub fn index(ctx: Arc<AppContext>, _req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let rows = ctx.sales().all().await?;
        Ok(Reply::ok(json!(rows)))
    })
}

/// GET /sale?id= (auth).
pub fn show(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let row = ctx.sales().get(id).await?;
        Ok(Reply::ok(Value::Object(row)))
    })
}

/// POST /sale/store (auth).
pub fn store(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        Validator::check(sale::RULES, &req.params).ok_or_fail()?;

        // The sale must belong to a real user.
        let user_id = req.params["user_id"].as_i64().unwrap_or(0);
        ctx.users().get(user_id).await?;

        let mut values = serde_json::Map::new();
        for key in ["cart", "value", "tax", "total", "user_id"] {
            values.insert(key.to_string(), req.params.get(key).cloned().unwrap_or(Value::Null));
        }

        let row = ctx.sales().save(&values).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// PUT /sale/update (admin): partial merge over the stored record.
pub fn update(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let sales = ctx.sales();
        let existing = sales.get(id).await?;

        let mut merged = serde_json::Map::new();
        for key in ["cart", "value", "tax", "total", "user_id"] {
            merged.insert(key.to_string(), merge_field(&req.params, &existing, key));
        }

        Validator::check(sale::RULES, &merged).ok_or_fail()?;

        let user_id = merged["user_id"].as_i64().unwrap_or(0);
        ctx.users().get(user_id).await?;

        let row = sales.save_or_update(id, &merged).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// DELETE /sale/delete (admin).
pub fn delete(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        let sales = ctx.sales();
        sales.get(id).await?;
        sales.delete(id).await?;
        Ok(Reply::ok(json!("Sale deleted")))
    })
}
