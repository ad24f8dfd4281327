//! User entity: identity rows plus password handling.
//!
//! The password hash is deliberately absent from the visible column list; it
//! never travels back to clients and is fetched lazily by a dedicated query
//! only when a credential check needs it.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::mapper::{Mapper, Schema};
use crate::db::store::Store;
use crate::error::ApiError;
use crate::validate::{FieldRules, Rule};

pub static SCHEMA: Schema = Schema {
    table: "users",
    visible: &["id", "name", "email", "admin"],
    fillable: &["name", "email", "password", "admin"],
};

pub static STORE_RULES: &[FieldRules] = &[
    ("name", &[Rule::Required, Rule::Str]),
    ("email", &[Rule::Required, Rule::Email]),
    (
        "password",
        &[Rule::Required, Rule::Min(6), Rule::Max(255), Rule::Same("confirmation")],
    ),
    ("confirmation", &[Rule::Required, Rule::Min(6), Rule::Max(255)]),
];

pub static UPDATE_RULES: &[FieldRules] = &[
    ("name", &[Rule::Required, Rule::Str]),
    ("email", &[Rule::Required, Rule::Email]),
];

/// Visible projection of a user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    pub fn from_row(row: &serde_json::Map<String, Value>) -> Result<Self, ApiError> {
        serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| ApiError::internal(format!("malformed user row: {}", e)))
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Fetch the stored hash for this user. Separate from the mapper because
    /// the password column is not visible.
    pub async fn password_hash(&self, store: &Store) -> Result<String, ApiError> {
        if self.id == 0 {
            return Err(ApiError::not_found("User id is empty"));
        }
        let row = store
            .fetch_one(
                "SELECT password FROM users WHERE id = $1",
                &[Value::from(self.id)],
            )
            .await?;
        match row.get("password").and_then(Value::as_str) {
            Some(hash) => Ok(hash.to_string()),
            None => Err(ApiError::internal("user row is missing its password hash")),
        }
    }

    /// Compare a candidate password against the stored Argon2 hash.
    pub async fn verify_password(&self, store: &Store, candidate: &str) -> Result<bool, ApiError> {
        let stored = self.password_hash(store).await?;
        Ok(verify_password(candidate, &stored))
    }
}

pub async fn get_by_email(users: &Mapper, email: &str) -> Result<User, ApiError> {
    let row = users
        .get_by_column("email", Value::String(email.to_string()))
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => {
                ApiError::not_found(format!("The users with email {} does not exist", email))
            }
            other => other,
        })?;
    User::from_row(&row)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_round_trips_through_argon2() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn verify_rejects_garbage_hashes() {
        assert!(!verify_password("secret1", "not-a-hash"));
    }

    #[test]
    fn user_deserializes_from_visible_row_with_default_admin() {
        let row = json!({"id": 3, "name": "Ana", "email": "a@b.com"});
        let user = User::from_row(row.as_object().unwrap()).unwrap();
        assert_eq!(user.id, 3);
        assert!(!user.is_admin());
    }

    #[test]
    fn schema_never_exposes_the_password_column() {
        assert!(!SCHEMA.visible.contains(&"password"));
        assert!(SCHEMA.fillable.contains(&"password"));
    }
}
