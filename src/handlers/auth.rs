//! Session handlers: login mints (or returns) the caller's token, verify
//! echoes the identity behind a presented token, logout revokes it.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::context::AppContext;
use crate::error::ApiError;
use crate::http::response::Reply;
use crate::http::router::{HandlerFuture, RequestContext};
use crate::models::user;
use crate::validate::{Rule, Validator};

/// POST /login (guest). Wrong password reads as 401 "Wrong credentials";
/// an unknown email keeps its NotFound shape from the lookup.
pub fn login(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        Validator::check(
            &[
                ("email", &[Rule::Required, Rule::Email]),
                ("password", &[Rule::Required, Rule::Str, Rule::Min(6), Rule::Max(32)]),
            ],
            &req.params,
        )
        .ok_or_fail()?;

        let email = req.params["email"].as_str().unwrap_or_default();
        let password = req.params["password"].as_str().unwrap_or_default();

        let account = user::get_by_email(&ctx.users(), email).await?;
        if !account.verify_password(&ctx.store, password).await? {
            return Err(ApiError::unauthorized("Wrong credentials"));
        }

        let record = ctx.authority().create_token(&account).await?;
        Ok(Reply::ok(json!({
            "token": record.token,
            "user": account,
        })))
    })
}

/// POST /verify (auth). The route policy has already validated the token;
/// this reports whose it is.
pub fn verify(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let bearer = req
            .bearer
            .as_deref()
            .ok_or_else(|| ApiError::unauthorized("Token not found"))?;
        let authority = ctx.authority();
        let record = authority.get_by_token(bearer).await?;
        authority.is_valid(&record.token)?;
        let account = record.resolve_user(&ctx.users()).await?;
        Ok(Reply::ok(json!({
            "token": record.token,
            "user": account,
        })))
    })
}

/// POST /logout (auth). Deletes the caller's token row; there is no refresh
/// path, so the next login mints a fresh token.
pub fn logout(ctx: Arc<AppContext>, req: RequestContext) -> HandlerFuture {
    Box::pin(async move {
        let mut data = req.params.clone();
        if let Some(bearer) = req.bearer.as_deref() {
            data.insert("token".to_string(), Value::String(bearer.to_string()));
        }
        Validator::check(
            &[
                ("token", &[Rule::Required, Rule::Str]),
                ("email", &[Rule::Required, Rule::Email]),
            ],
            &data,
        )
        .ok_or_fail()?;

        let bearer = req.bearer.as_deref().unwrap_or_default();
        let email = req.params["email"].as_str().unwrap_or_default();

        // The email must name a real account; the lookup fails loudly if not.
        user::get_by_email(&ctx.users(), email).await?;

        let authority = ctx.authority();
        let record = authority.get_by_token(bearer).await?;
        authority.is_valid(&record.token)?;
        authority.revoke(&record).await?;

        Ok(Reply::ok(json!("User logged out successfully")))
    })
}
