//! User CRUD. Registration is public; everything touching an existing user
//! runs behind the auth policy plus the same-identity check, so a user can
//! manage themselves and an admin can manage anyone.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::policy::check_token;
use crate::context::AppContext;
use crate::handlers::{merge_field, require_id};
use crate::http::response::Reply;
use crate::http::router::{HandlerFuture, RequestContext};
use crate::models::user::{self, User};
use crate::validate::Validator;

/// GET /users (admin).
pub fn index(ctx: Arc<AppContext>, _req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let rows = ctx.users().all().await?;
        Ok(Reply::ok(json!(rows)))
    })
}

/// GET /user?id= (auth + same-identity).
pub fn show(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        check_token(&ctx, req.bearer.as_deref(), id).await?;
        let row = ctx.users().get(id).await?;
        Ok(Reply::ok(Value::Object(row)))
    })
}

/// POST /user/store (guest): registration. New accounts are never admins.
pub fn store(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let users = ctx.users();
        let mut validator = Validator::check(user::STORE_RULES, &req.params);
        if let Some(email) = req.params.get("email").filter(|v| v.is_string()) {
            if !users.is_unique("email", email, None).await? {
                validator.add_unique_violation("email");
            }
        }
        validator.ok_or_fail()?;

        let password = req.params["password"].as_str().unwrap_or_default();
        let mut values = serde_json::Map::new();
        values.insert("name".to_string(), req.params["name"].clone());
        values.insert("email".to_string(), req.params["email"].clone());
        values.insert(
            "password".to_string(),
            Value::String(user::hash_password(password)?),
        );
        values.insert("admin".to_string(), Value::Bool(false));

        let row = users.save(&values).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// PUT /user/update (auth + same-identity): partial merge of name/email.
/// The stored password hash and admin flag are carried over untouched.
pub fn update(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        check_token(&ctx, req.bearer.as_deref(), id).await?;

        let users = ctx.users();
        let existing = users.get(id).await?;

        let mut merged = serde_json::Map::new();
        merged.insert("name".to_string(), merge_field(&req.params, &existing, "name"));
        merged.insert("email".to_string(), merge_field(&req.params, &existing, "email"));

        let mut validator = Validator::check(user::UPDATE_RULES, &merged);
        if !users.is_unique("email", &merged["email"], Some(id)).await? {
            validator.add_unique_violation("email");
        }
        validator.ok_or_fail()?;

        let account = User::from_row(&existing)?;
        merged.insert(
            "password".to_string(),
            Value::String(account.password_hash(&ctx.store).await?),
        );
        merged.insert(
            "admin".to_string(),
            existing.get("admin").cloned().unwrap_or(Value::Bool(false)),
        );

        let row = users.save_or_update(id, &merged).await?;
        Ok(Reply::created(Value::Object(row)))
    })
}

/// DELETE /user/delete (auth + same-identity).
pub fn delete(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let id = require_id(&req.params)?;
        check_token(&ctx, req.bearer.as_deref(), id).await?;
        let users = ctx.users();
        users.get(id).await?;
        users.delete(id).await?;
        Ok(Reply::ok(json!("User deleted")))
    })
}

#[cfg(test)]
mod tests {
    use crate::models::user::STORE_RULES;
    use crate::validate::Validator;
    use serde_json::json;

    #[test]
    fn registration_payload_must_carry_a_confirmed_password() {
        let data = json!({
            "name": "Ana",
            "email": "a@b.com",
            "password": "secret1",
            "confirmation": "different"
        });
        let v = Validator::check(STORE_RULES, data.as_object().unwrap());
        let err = v.into_error().to_json();
        assert_eq!(err["message"]["password"]["same"], "The field password must be the same as confirmation.");
    }

    #[test]
    fn well_formed_registration_passes_static_rules() {
        let data = json!({
            "name": "Ana",
            "email": "a@b.com",
            "password": "secret1",
            "confirmation": "secret1"
        });
        assert!(!Validator::check(STORE_RULES, data.as_object().unwrap()).fails());
    }
}
