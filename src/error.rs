// HTTP API error types. Every failure in the core funnels into ApiError and
// leaves the process as a `{"message": ..., "code": n}` JSON body whose code
// matches the HTTP response status.
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::db::store::StoreError;

#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    /// Field-level validation failures; the error map becomes the envelope's
    /// `message` so clients see `{field: {rule: text}}`.
    Validation(Value),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity (a write affected zero rows)
    Unprocessable(String),

    // 500 Internal Server Error
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Unprocessable(_) => 422,
            ApiError::Internal(_) => 500,
        }
    }

    /// Client-facing message: a plain string for most kinds, the field-error
    /// map for validation failures.
    pub fn message(&self) -> Value {
        match self {
            ApiError::Validation(errors) => errors.clone(),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unprocessable(msg)
            | ApiError::Internal(msg) => Value::String(msg.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "message": self.message(),
            "code": self.status_code(),
        })
    }
}

// Static constructors, mirroring how handlers raise errors.
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        ApiError::Unprocessable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found("We cannot find the record"),
            StoreError::NoRowsAffected => ApiError::unprocessable("No rows were affected"),
            StoreError::Constraint(msg) => ApiError::unprocessable(msg),
            StoreError::Syntax(msg) => {
                tracing::error!("query syntax error: {}", msg);
                ApiError::internal("There was a syntax error in the query")
            }
            StoreError::MissingDatabase(msg) => {
                tracing::error!("missing database: {}", msg);
                ApiError::internal("The database doesn't exist")
            }
            StoreError::Connection(msg) => {
                tracing::error!("database connection error: {}", msg);
                ApiError::internal("Could not reach the database")
            }
            StoreError::Other(msg) => {
                tracing::error!("unclassified store error: {}", msg);
                ApiError::internal("There was an error while trying to execute the query")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // A code that is not a usable HTTP status collapses to 500.
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_message_and_matching_code() {
        let err = ApiError::unauthorized("Wrong credentials");
        assert_eq!(
            err.to_json(),
            json!({"message": "Wrong credentials", "code": 401})
        );
    }

    #[test]
    fn validation_errors_embed_the_field_map() {
        let err = ApiError::Validation(json!({
            "name": {"unique": "The field name must be unique."}
        }));
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.to_json()["message"]["name"]["unique"],
            "The field name must be unique."
        );
    }

    #[test]
    fn store_errors_remap_to_domain_kinds() {
        assert_eq!(ApiError::from(StoreError::NotFound).status_code(), 404);
        assert_eq!(ApiError::from(StoreError::NoRowsAffected).status_code(), 422);
        assert_eq!(
            ApiError::from(StoreError::Connection("refused".into())).status_code(),
            500
        );
    }
}
