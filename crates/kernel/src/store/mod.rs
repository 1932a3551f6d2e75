//! Generic single-table store interface.
//!
//! Repositories talk to persistence exclusively through [`Store`]: filtered
//! select/insert/update/delete/count statements against one [`Table`] at a
//! time. Rows travel as JSON objects and are converted to typed records with
//! [`to_row`] and [`from_row`].

mod memory;
mod postgres;

pub use memory::{FaultOp, MemoryStore};
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// One stored row, keyed by column name.
pub type Row = Map<String, Value>;

/// Tables owned by the form kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Forms,
    FormFields,
    FieldOptions,
    FormResponses,
    ResponseValues,
}

impl Table {
    /// SQL table name.
    pub fn name(self) -> &'static str {
        match self {
            Table::Forms => "forms",
            Table::FormFields => "form_fields",
            Table::FieldOptions => "field_options",
            Table::FormResponses => "form_responses",
            Table::ResponseValues => "response_values",
        }
    }

    /// Tables whose rows are deleted along with a row of this table,
    /// with the referencing column.
    ///
    /// Mirrors the `ON DELETE CASCADE` foreign keys in the migrations.
    pub fn cascades(self) -> &'static [(Table, &'static str)] {
        match self {
            Table::Forms => &[
                (Table::FormFields, "form_id"),
                (Table::FormResponses, "form_id"),
            ],
            Table::FormFields => &[
                (Table::FieldOptions, "field_id"),
                (Table::ResponseValues, "field_id"),
            ],
            Table::FormResponses => &[(Table::ResponseValues, "response_id")],
            Table::FieldOptions | Table::ResponseValues => &[],
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value (`NULL` matches `IS NULL`).
    Eq(&'static str, Value),
    /// Column is one of the values.
    In(&'static str, Vec<Value>),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Filters and ordering for a single-table statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<(&'static str, Direction)>,
}

impl Query {
    /// An empty query (matches every row).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    pub fn eq(mut self, column: &'static str, value: impl Serialize) -> Self {
        self.filters.push(Filter::Eq(column, json_value(value)));
        self
    }

    /// Add an `IN` filter.
    pub fn is_in<T: Serialize>(
        mut self,
        column: &'static str,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let values = values.into_iter().map(json_value).collect();
        self.filters.push(Filter::In(column, values));
        self
    }

    /// Order ascending by a column.
    pub fn order_asc(mut self, column: &'static str) -> Self {
        self.order.push((column, Direction::Asc));
        self
    }

    /// Order descending by a column.
    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order.push((column, Direction::Desc));
        self
    }

    /// Whether the query narrows the row set at all.
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty()
    }
}

fn json_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{op} on {table} failed: {message}")]
    Backend {
        table: Table,
        op: &'static str,
        message: String,
    },

    #[error("refusing unfiltered {op} on {table}")]
    Unfiltered { table: Table, op: &'static str },

    #[error("malformed row: {0}")]
    Decode(String),
}

impl StoreError {
    pub(crate) fn backend(table: Table, op: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            table,
            op,
            message: err.to_string(),
        }
    }
}

/// Backing store for forms and responses.
///
/// Every method is a single statement against a single table. Multi-row
/// inserts are one statement and either persist every row or none.
#[async_trait]
pub trait Store: Send + Sync {
    /// Select rows matching `query`, in the requested order.
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Insert rows, returning them as stored.
    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, StoreError>;

    /// Set `values` on every row matching `query`. Returns the affected count.
    async fn update(&self, table: Table, query: &Query, values: Row) -> Result<u64, StoreError>;

    /// Delete every row matching `query` (cascading). Returns the affected count.
    async fn delete(&self, table: Table, query: &Query) -> Result<u64, StoreError>;

    /// Count rows matching `query`.
    async fn count(&self, table: Table, query: &Query) -> Result<i64, StoreError>;

    /// Whether the store is reachable.
    async fn ping(&self) -> bool;
}

/// Serialize a record into a row.
pub fn to_row<T: Serialize>(record: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(StoreError::Decode(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

/// Deserialize a row into a record.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Deserialize many rows.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(from_row).collect()
}
