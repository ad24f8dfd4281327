//! Generic CRUD over one table, driven by a declared field schema.
//!
//! Each entity contributes a [`Schema`] naming its table, the columns
//! returned to clients (visible) and the columns accepted on writes
//! (fillable). SELECT column lists and INSERT/UPDATE statements are
//! synthesized from those lists, so no entity writes SQL of its own.

use serde_json::Value;

use crate::db::store::{RowMap, Store, StoreError};
use crate::error::ApiError;

/// Declarative table description. Column lists are ordered and fixed at
/// compile time; `id` is always visible and never fillable.
pub struct Schema {
    pub table: &'static str,
    pub visible: &'static [&'static str],
    pub fillable: &'static [&'static str],
}

impl Schema {
    /// Comma-joined visible columns for SELECT lists.
    pub fn select_columns(&self) -> String {
        self.visible.join(", ")
    }

    pub fn select_all_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.select_columns(), self.table)
    }

    pub fn select_by_column_sql(&self, column: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            self.select_columns(),
            self.table,
            column
        )
    }

    pub fn insert_sql(&self) -> String {
        let placeholders: Vec<String> =
            (1..=self.fillable.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            self.table,
            self.fillable.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn update_sql(&self) -> String {
        let assignments: Vec<String> = self
            .fillable
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ${}", col, i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE id = ${}",
            self.table,
            assignments.join(", "),
            self.fillable.len() + 1
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE id = $1", self.table)
    }

    /// Count rows matching one column. With `exclude_id` the statement takes
    /// a second bind for the record's own id, so an update keeping its value
    /// does not count itself.
    pub fn count_by_column_sql(&self, column: &str, exclude_id: bool) -> String {
        if exclude_id {
            format!(
                "SELECT COUNT(*) AS count FROM {} WHERE {} = $1 AND id != $2",
                self.table, column
            )
        } else {
            format!(
                "SELECT COUNT(*) AS count FROM {} WHERE {} = $1",
                self.table, column
            )
        }
    }

    /// True when the column is part of this schema and therefore safe to
    /// splice into a statement.
    fn has_column(&self, column: &str) -> bool {
        self.visible.contains(&column) || self.fillable.contains(&column)
    }

    /// Pull the fillable values out of a loosely-typed map in declared
    /// column order. Missing entries become SQL NULL.
    fn fillable_params(&self, values: &RowMap) -> Vec<Value> {
        self.fillable
            .iter()
            .map(|col| values.get(*col).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// Short-lived row mapper bound to one entity schema. Handlers create one per
/// request; it holds nothing beyond the schema reference and a pool handle.
pub struct Mapper {
    schema: &'static Schema,
    store: Store,
}

impl Mapper {
    pub fn new(schema: &'static Schema, store: Store) -> Self {
        debug_assert!(schema.visible.contains(&"id"));
        debug_assert!(!schema.fillable.contains(&"id"));
        Self { schema, store }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Every record, visible columns only. Zero rows is a NotFound.
    pub async fn all(&self) -> Result<Vec<RowMap>, ApiError> {
        let rows = self.store.fetch_all(&self.schema.select_all_sql(), &[]).await?;
        Ok(rows)
    }

    /// One record by id, with the entity's table named in the error so the
    /// client can tell which lookup failed.
    pub async fn get(&self, id: i64) -> Result<RowMap, ApiError> {
        self.get_by_column("id", Value::from(id))
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::not_found(format!(
                    "The {} with id {} does not exist",
                    self.schema.table, id
                )),
                other => other,
            })
    }

    /// Raw single-column lookup used by `get` and by uniqueness checks.
    pub async fn get_by_column(&self, column: &str, value: Value) -> Result<RowMap, ApiError> {
        if !self.schema.has_column(column) {
            return Err(ApiError::internal(format!(
                "unknown column {} for table {}",
                column, self.schema.table
            )));
        }
        let row = self
            .store
            .fetch_one(&self.schema.select_by_column_sql(column), &[value])
            .await?;
        Ok(row)
    }

    /// INSERT the fillable columns in declared order and return the freshly
    /// persisted record via its new id.
    pub async fn save(&self, values: &RowMap) -> Result<RowMap, ApiError> {
        let params = self.schema.fillable_params(values);
        let id = self
            .store
            .insert_returning_id(&self.schema.insert_sql(), &params)
            .await?;
        self.get(id).await
    }

    /// UPDATE all fillable columns by id; a write that touches zero rows is
    /// an unprocessable entity, not a silent success.
    pub async fn update(&self, id: i64, values: &RowMap) -> Result<RowMap, ApiError> {
        let mut params = self.schema.fillable_params(values);
        params.push(Value::from(id));
        self.store
            .execute_or_fail(&self.schema.update_sql(), &params)
            .await?;
        self.get(id).await
    }

    /// The sole write entry point used by handlers: id 0 means the record
    /// has never been persisted and must be inserted.
    pub async fn save_or_update(&self, id: i64, values: &RowMap) -> Result<RowMap, ApiError> {
        if id != 0 {
            self.update(id, values).await
        } else {
            self.save(values).await
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.store
            .execute_or_fail(&self.schema.delete_sql(), &[Value::from(id)])
            .await?;
        Ok(())
    }

    /// Uniqueness probe for validation. In an update context the record's
    /// own row is excluded, so keeping a value is never a violation.
    pub async fn is_unique(
        &self,
        column: &str,
        value: &Value,
        exclude_id: Option<i64>,
    ) -> Result<bool, ApiError> {
        if !self.schema.has_column(column) {
            return Err(ApiError::internal(format!(
                "unknown column {} for table {}",
                column, self.schema.table
            )));
        }
        let sql = self.schema.count_by_column_sql(column, exclude_id.is_some());
        let params = match exclude_id {
            Some(id) => vec![value.clone(), Value::from(id)],
            None => vec![value.clone()],
        };
        let count = self.store.count(&sql, &params).await?;
        Ok(count == 0)
    }
}

/// Read the integer id out of a fetched row; absent or 0 means unpersisted.
pub fn row_id(row: &RowMap) -> i64 {
    row.get("id").and_then(Value::as_i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_SCHEMA: Schema = Schema {
        table: "types",
        visible: &["id", "name", "tax"],
        fillable: &["name", "tax"],
    };

    #[test]
    fn select_lists_only_visible_columns_in_declared_order() {
        assert_eq!(
            TEST_SCHEMA.select_all_sql(),
            "SELECT id, name, tax FROM types"
        );
        assert_eq!(
            TEST_SCHEMA.select_by_column_sql("name"),
            "SELECT id, name, tax FROM types WHERE name = $1"
        );
    }

    #[test]
    fn insert_binds_fillable_columns_positionally_and_returns_id() {
        assert_eq!(
            TEST_SCHEMA.insert_sql(),
            "INSERT INTO types (name, tax) VALUES ($1, $2) RETURNING id"
        );
    }

    #[test]
    fn update_assigns_every_fillable_column_and_filters_by_id() {
        assert_eq!(
            TEST_SCHEMA.update_sql(),
            "UPDATE types SET name = $1, tax = $2 WHERE id = $3"
        );
    }

    #[test]
    fn fillable_params_follow_declared_order_with_null_gaps() {
        let mut values = RowMap::new();
        values.insert("tax".to_string(), Value::from(8));
        let params = TEST_SCHEMA.fillable_params(&values);
        assert_eq!(params, vec![Value::Null, Value::from(8)]);
    }

    #[test]
    fn uniqueness_count_excludes_the_record_itself_in_update_context() {
        assert_eq!(
            TEST_SCHEMA.count_by_column_sql("name", false),
            "SELECT COUNT(*) AS count FROM types WHERE name = $1"
        );
        assert_eq!(
            TEST_SCHEMA.count_by_column_sql("name", true),
            "SELECT COUNT(*) AS count FROM types WHERE name = $1 AND id != $2"
        );
    }

    #[test]
    fn row_id_defaults_to_unpersisted_sentinel() {
        let row = RowMap::new();
        assert_eq!(row_id(&row), 0);
        let mut row = RowMap::new();
        row.insert("id".to_string(), Value::from(7));
        assert_eq!(row_id(&row), 7);
    }
}
