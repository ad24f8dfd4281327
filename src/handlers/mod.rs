//! Request handlers, one module per entity, plus the route table binding
//! each (method, path) to its handler and access policy.

pub mod auth;
pub mod products;
pub mod sales;
pub mod types;
pub mod users;

use serde_json::Value;

use crate::auth::policy::Policy;
use crate::db::store::RowMap;
use crate::error::ApiError;
use crate::http::request::Params;
use crate::http::router::RouteTable;

/// The complete route table. Built once at startup; the policy column is the
/// single source of truth for who may call what.
pub fn routes() -> RouteTable {
    RouteTable::builder()
        // Users
        .get("/users", Policy::Admin, users::index)
        .get("/user", Policy::Auth, users::show)
        .post("/user/store", Policy::Guest, users::store)
        .put("/user/update", Policy::Auth, users::update)
        .delete("/user/delete", Policy::Auth, users::delete)
        // Products
        .get("/products", Policy::Guest, products::index)
        .get("/product", Policy::Guest, products::show)
        .post("/product/store", Policy::Admin, products::store)
        .put("/product/update", Policy::Admin, products::update)
        .delete("/product/delete", Policy::Admin, products::delete)
        // Product types
        .get("/types", Policy::Guest, types::index)
        .get("/type", Policy::Guest, types::show)
        .post("/type/store", Policy::Admin, types::store)
        .put("/type/update", Policy::Admin, types::update)
        .delete("/type/delete", Policy::Admin, types::delete)
        // Sales
        .get("/sales", Policy::Admin, sales::index)
        .get("/sale", Policy::Auth, sales::show)
        .post("/sale/store", Policy::Auth, sales::store)
        .put("/sale/update", Policy::Admin, sales::update)
        .delete("/sale/delete", Policy::Admin, sales::delete)
        // Sessions
        .post("/login", Policy::Guest, auth::login)
        .post("/verify", Policy::Auth, auth::verify)
        .post("/logout", Policy::Auth, auth::logout)
        .build()
}

/// Pull the target record id out of the parameters. Handlers that operate on
/// one record treat a missing or non-positive id as a bad request.
pub(crate) fn require_id(params: &Params) -> Result<i64, ApiError> {
    params
        .get("id")
        .and_then(Value::as_i64)
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("The field id is required"))
}

/// Partial-update merge: an absent, null, or blank parameter keeps the
/// stored value. Blank strings and null are conflated on purpose; clients
/// send either to mean "leave it alone".
pub(crate) fn merge_field(params: &Params, existing: &RowMap, key: &str) -> Value {
    match params.get(key) {
        None | Some(Value::Null) => existing.get(key).cloned().unwrap_or(Value::Null),
        Some(Value::String(s)) if s.is_empty() => {
            existing.get(key).cloned().unwrap_or(Value::Null)
        }
        Some(value) => value.clone(),
    }
}
