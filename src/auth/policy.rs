//! Per-route access policies.
//!
//! Every route table entry names one of three policies, evaluated with the
//! request's bearer value before the handler runs. `check_token` is the
//! extra same-identity gate some user handlers apply on top: a user may act
//! on themselves, an admin may act on anyone.

use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Public endpoint; passes with or without a bearer value.
    Guest,
    /// Requires a present, known, unexpired, correctly signed token.
    Auth,
    /// `Auth`, plus the resolved user must hold the admin flag.
    Admin,
}

impl Policy {
    pub async fn authorize(
        &self,
        ctx: &AppContext,
        bearer: Option<&str>,
    ) -> Result<(), ApiError> {
        match self {
            Policy::Guest => Ok(()),
            Policy::Auth => {
                let bearer = require_bearer(bearer)?;
                let authority = ctx.authority();
                let record = authority.get_by_token(bearer).await?;
                authority.is_valid(&record.token)?;
                Ok(())
            }
            Policy::Admin => {
                let bearer = require_bearer(bearer)?;
                let authority = ctx.authority();
                let record = authority.get_by_token(bearer).await?;
                let user = record.resolve_user(&ctx.users()).await?;
                if !user.is_admin() {
                    return Err(ApiError::unauthorized("You are not an admin"));
                }
                authority.is_valid(&record.token)?;
                Ok(())
            }
        }
    }
}

fn require_bearer(bearer: Option<&str>) -> Result<&str, ApiError> {
    bearer.ok_or_else(|| ApiError::unauthorized("Token not found"))
}

/// Same-identity check: the token must belong to the target user, unless its
/// owner is an admin.
pub async fn check_token(
    ctx: &AppContext,
    bearer: Option<&str>,
    target_user_id: i64,
) -> Result<(), ApiError> {
    let bearer = require_bearer(bearer)?;
    let record = ctx.authority().get_by_token(bearer).await?;
    if record.user_id() == target_user_id {
        return Ok(());
    }
    let user = record.resolve_user(&ctx.users()).await?;
    if user.is_admin() {
        return Ok(());
    }
    Err(ApiError::forbidden(
        "You don't have permission to access this resource",
    ))
}
