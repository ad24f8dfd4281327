//! The token authority: mints, looks up, and revokes persisted bearer
//! tokens. Exactly one live token exists per user; minting for a user who
//! already holds a token returns the stored row unchanged.
//!
//! The signing secret and lifetime are constructor arguments, never read
//! from ambient configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{sign, verify, Claims};
use crate::db::mapper::{Mapper, Schema};
use crate::db::store::Store;
use crate::error::ApiError;
use crate::models::user::User;

pub static SCHEMA: Schema = Schema {
    table: "tokens",
    visible: &["id", "token", "user_id"],
    fillable: &["token", "user_id"],
};

/// A persisted token row. Holds only the owning user's id; resolving the
/// user is an explicit second step against the user mapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
}

impl TokenRecord {
    fn from_row(row: &serde_json::Map<String, Value>) -> Result<Self, ApiError> {
        serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| ApiError::internal(format!("malformed token row: {}", e)))
    }

    /// Cheap accessor; always available without touching the store.
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Fetch the owning user. Fails with NotFound when the back-reference
    /// was never set.
    pub async fn resolve_user(&self, users: &Mapper) -> Result<User, ApiError> {
        if self.user_id == 0 {
            return Err(ApiError::not_found("User id is empty"));
        }
        let row = users.get(self.user_id).await?;
        User::from_row(&row)
    }
}

pub struct TokenAuthority {
    secret: String,
    ttl_secs: i64,
    store: Store,
}

impl TokenAuthority {
    pub fn new(secret: impl Into<String>, ttl_secs: i64, store: Store) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
            store,
        }
    }

    fn tokens(&self) -> Mapper {
        Mapper::new(&SCHEMA, self.store.clone())
    }

    /// Idempotent mint: return the user's existing token row if one is
    /// persisted, otherwise sign a fresh JWT and persist it. No rotation.
    pub async fn create_token(&self, user: &User) -> Result<TokenRecord, ApiError> {
        let lookup = self
            .tokens()
            .get_by_column("user_id", Value::from(user.id))
            .await;
        if let Some(record) = existing_token(lookup)? {
            return Ok(record);
        }

        let claims = Claims::new(user.email.clone(), self.ttl_secs);
        let token = sign(&claims, &self.secret)?;

        let mut values = serde_json::Map::new();
        values.insert("token".to_string(), Value::String(token));
        values.insert("user_id".to_string(), Value::from(user.id));
        let row = self.tokens().save(&values).await?;
        TokenRecord::from_row(&row)
    }

    /// Row lookup by token string. A miss is an unknown credential, so the
    /// store's NotFound is deliberately remapped to Unauthorized here.
    pub async fn get_by_token(&self, token: &str) -> Result<TokenRecord, ApiError> {
        match self
            .tokens()
            .get_by_column("token", Value::String(token.to_string()))
            .await
        {
            Ok(row) => TokenRecord::from_row(&row),
            Err(ApiError::NotFound(_)) => Err(ApiError::unauthorized("Token not found")),
            Err(other) => Err(other),
        }
    }

    /// Signature and expiry validation of a presented token string.
    pub fn is_valid(&self, token: &str) -> Result<Claims, ApiError> {
        verify(token, &self.secret)
    }

    /// Delete the token row. Logout is the only caller; there is no refresh
    /// path that would resurrect it.
    pub async fn revoke(&self, record: &TokenRecord) -> Result<(), ApiError> {
        self.tokens().delete(record.id).await
    }
}

/// One-token-per-user rule: a persisted row always wins over a fresh mint
/// and comes back verbatim. Only a NotFound lookup opens the mint path.
fn existing_token(
    lookup: Result<serde_json::Map<String, Value>, ApiError>,
) -> Result<Option<TokenRecord>, ApiError> {
    match lookup {
        Ok(row) => TokenRecord::from_row(&row).map(Some),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded_row() -> serde_json::Map<String, Value> {
        json!({"id": 1, "token": "aaa.bbb.ccc", "user_id": 3})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn persisted_token_row_is_returned_unchanged_on_every_mint() {
        // Two mints against the same stored row yield the same token string;
        // no second row is ever created.
        let first = existing_token(Ok(seeded_row())).unwrap().unwrap();
        let second = existing_token(Ok(seeded_row())).unwrap().unwrap();
        assert_eq!(first.token, "aaa.bbb.ccc");
        assert_eq!(first.token, second.token);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn only_a_missing_row_opens_the_mint_path() {
        let outcome = existing_token(Err(ApiError::not_found("We cannot find the record")));
        assert!(outcome.unwrap().is_none());
    }

    #[test]
    fn lookup_failures_other_than_not_found_propagate() {
        let outcome = existing_token(Err(ApiError::internal("pool is gone")));
        assert_eq!(outcome.unwrap_err().status_code(), 500);
    }
}
