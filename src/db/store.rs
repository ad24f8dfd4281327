//! Thin wrapper over the SQL connection pool.
//!
//! Statements are always parameterized; callers pass values separately and
//! nothing from a request is ever interpolated into SQL text. Result rows are
//! surfaced as JSON objects (via Postgres `row_to_json`) so the generic
//! mapper can work from a declared column list instead of compile-time row
//! types. An empty result set is reported as `NotFound` rather than an empty
//! collection; see DESIGN.md for the rationale.

use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Classified row-store failures. None of these are retryable; every failure
/// is terminal for the current request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("We cannot find the record")]
    NotFound,

    #[error("No rows were affected")]
    NoRowsAffected,

    #[error("There was a syntax error in the query: {0}")]
    Syntax(String),

    #[error("The database doesn't exist: {0}")]
    MissingDatabase(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Other(String),
}

impl StoreError {
    /// The store performs no retries and promises callers it never will.
    pub fn retryable(&self) -> bool {
        false
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Connection("connection pool unavailable".to_string())
            }
            sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Configuration(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.to_string()).unwrap_or_default();
                match code.as_str() {
                    // SQLSTATE 42601: syntax error
                    "42601" => StoreError::Syntax(db.message().to_string()),
                    // SQLSTATE 3D000: invalid catalog name
                    "3D000" => StoreError::MissingDatabase(db.message().to_string()),
                    // SQLSTATE class 23: integrity constraint violation
                    c if c.starts_with("23") => StoreError::Constraint(db.message().to_string()),
                    _ => StoreError::Other(db.message().to_string()),
                }
            }
            other => StoreError::Other(other.to_string()),
        }
    }
}

/// One JSON-shaped row.
pub type RowMap = Map<String, Value>;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Open a pool against the configured database, verifying connectivity
    /// up front so a bad host or port fails here and not mid-request.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url()
            .map_err(|e| StoreError::Connection(format!("invalid database config: {}", e)))?;
        let pool = PgPoolOptions::new().connect(&url).await?;
        Ok(Self { pool })
    }

    /// Open a pool without touching the network. Connections are established
    /// on first use; tests exercising non-database paths rely on this.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url()
            .map_err(|e| StoreError::Connection(format!("invalid database config: {}", e)))?;
        let pool = PgPoolOptions::new()
            .connect_lazy(&url)
            .map_err(StoreError::from)?;
        Ok(Self { pool })
    }

    /// Fetch exactly one row as a JSON object. `NotFound` when no row matches.
    pub async fn fetch_one(&self, sql: &str, params: &[Value]) -> Result<RowMap, StoreError> {
        let wrapped = wrap_row_to_json(sql);
        let row = bind_all(sqlx::query(&wrapped), params)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        row_object(row)
    }

    /// Fetch all matching rows as JSON objects. An empty result set is a
    /// `NotFound`, matching the store's deliberate empty-as-error policy.
    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<RowMap>, StoreError> {
        let wrapped = wrap_row_to_json(sql);
        let rows = bind_all(sqlx::query(&wrapped), params)
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        rows.into_iter().map(row_object).collect()
    }

    /// Run a write statement, returning the affected-row count.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Run a write statement and fail with `NoRowsAffected` when it touched
    /// nothing (stale id or no-op update).
    pub async fn execute_or_fail(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let affected = self.execute(sql, params).await?;
        if affected == 0 {
            return Err(StoreError::NoRowsAffected);
        }
        Ok(affected)
    }

    /// Run an INSERT carrying a `RETURNING id` clause and hand back the fresh
    /// id. Stands in for `lastInsertId` on drivers that track it implicitly.
    pub async fn insert_returning_id(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<i64, StoreError> {
        let row = bind_all(sqlx::query(sql), params).fetch_one(&self.pool).await?;
        let id: i64 = row.try_get("id")?;
        Ok(id)
    }

    /// Count matching rows; unlike the fetch calls, zero is a valid answer.
    pub async fn count(&self, sql: &str, params: &[Value]) -> Result<i64, StoreError> {
        let row = bind_all(sqlx::query(sql), params).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

/// Wrap a SELECT so each result row comes back as a single JSON column.
fn wrap_row_to_json(sql: &str) -> String {
    format!("SELECT row_to_json(t) AS row FROM ({}) t", sql)
}

fn row_object(row: PgRow) -> Result<RowMap, StoreError> {
    let value: Value = row
        .try_get("row")
        .map_err(|e| StoreError::Other(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Other(format!(
            "expected a JSON object row, got {}",
            other
        ))),
    }
}

/// Bind loosely-typed JSON parameters positionally. Objects and arrays go in
/// as JSONB; numbers keep integer precision where they have it.
fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    query.bind(f)
                } else {
                    query.bind(n.to_string())
                }
            }
            Value::String(s) => query.bind(s),
            Value::Array(_) | Value::Object(_) => query.bind(value.clone()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_to_json_wrapping_preserves_the_inner_query() {
        assert_eq!(
            wrap_row_to_json("SELECT id, name FROM types WHERE id = $1"),
            "SELECT row_to_json(t) AS row FROM (SELECT id, name FROM types WHERE id = $1) t"
        );
    }

    #[test]
    fn no_store_error_is_retryable() {
        let errors = [
            StoreError::NotFound,
            StoreError::NoRowsAffected,
            StoreError::Syntax("x".into()),
            StoreError::MissingDatabase("x".into()),
            StoreError::Constraint("x".into()),
            StoreError::Connection("x".into()),
            StoreError::Other("x".into()),
        ];
        assert!(errors.iter().all(|e| !e.retryable()));
    }

    #[test]
    fn sqlx_row_not_found_classifies_as_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::NotFound));
    }
}
