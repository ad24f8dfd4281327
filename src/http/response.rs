//! Success replies. A handler returns its raw JSON value plus the status it
//! chose; errors travel separately as [`crate::error::ApiError`].

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: impl Into<Value>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn created(body: impl Into<Value>) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: body.into(),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}
