//! PostgreSQL store.
//!
//! Statements are built with sea-query and rendered with
//! `PostgresQueryBuilder`. Rows come back as `to_jsonb` documents so the
//! adapter never needs per-table column mappings. Literal values are emitted
//! untyped and coerce to the column type (uuid, timestamptz, jsonb) on the
//! server side.

use async_trait::async_trait;
use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Keyword, Order, PostgresQueryBuilder, Query as Sql,
    SelectStatement, SimpleExpr, Value as SqlValue,
};
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use super::{Direction, Filter, Query, Row, Store, StoreError, Table};

/// Store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Render a JSON value as an SQL literal.
fn literal(value: &Value) -> SimpleExpr {
    match value {
        Value::Null => SimpleExpr::Keyword(Keyword::Null),
        Value::Bool(b) => SimpleExpr::Value(SqlValue::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SimpleExpr::Value(SqlValue::from(i)),
            None => SimpleExpr::Value(SqlValue::from(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => SimpleExpr::Value(SqlValue::from(s.clone())),
        // Stored in jsonb columns.
        Value::Array(_) | Value::Object(_) => SimpleExpr::Value(SqlValue::from(value.to_string())),
    }
}

fn condition(filters: &[Filter]) -> Cond {
    filters.iter().fold(Cond::all(), |cond, filter| match filter {
        Filter::Eq(column, Value::Null) => cond.add(Expr::col(Alias::new(*column)).is_null()),
        Filter::Eq(column, value) => cond.add(Expr::col(Alias::new(*column)).eq(literal(value))),
        Filter::In(_, values) if values.is_empty() => cond.add(Expr::cust("FALSE")),
        Filter::In(column, values) => {
            cond.add(Expr::col(Alias::new(*column)).is_in(values.iter().map(literal)))
        }
    })
}

fn sql_order(direction: Direction) -> Order {
    match direction {
        Direction::Asc => Order::Asc,
        Direction::Desc => Order::Desc,
    }
}

/// `SELECT to_jsonb(t) FROM (SELECT * FROM table WHERE ..) t ORDER BY ..`
fn select_statement(table: Table, query: &Query) -> String {
    let mut inner = Sql::select();
    inner
        .column(Asterisk)
        .from(Alias::new(table.name()))
        .cond_where(condition(&query.filters));

    let mut outer: SelectStatement = Sql::select();
    outer
        .expr(Expr::cust("to_jsonb(t)"))
        .from_subquery(inner, Alias::new("t"));
    for (column, direction) in &query.order {
        outer.order_by((Alias::new("t"), Alias::new(*column)), sql_order(*direction));
    }
    outer.to_string(PostgresQueryBuilder)
}

/// Multi-row `INSERT .. RETURNING *`, wrapped so rows come back as jsonb.
fn insert_statement(table: Table, rows: &[Row]) -> Result<Option<String>, StoreError> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let columns: Vec<&String> = first.keys().collect();

    let mut insert = Sql::insert();
    insert
        .into_table(Alias::new(table.name()))
        .columns(columns.iter().map(|c| Alias::new(c.as_str())));
    for row in rows {
        let values = columns
            .iter()
            .map(|c| literal(row.get(c.as_str()).unwrap_or(&Value::Null)));
        insert
            .values(values)
            .map_err(|e| StoreError::backend(table, "insert", e))?;
    }
    insert.returning_all();

    Ok(Some(format!(
        "WITH inserted AS ({}) SELECT to_jsonb(inserted) FROM inserted",
        insert.to_string(PostgresQueryBuilder)
    )))
}

fn update_statement(table: Table, query: &Query, values: &Row) -> String {
    Sql::update()
        .table(Alias::new(table.name()))
        .values(
            values
                .iter()
                .map(|(column, value)| (Alias::new(column.as_str()), literal(value))),
        )
        .cond_where(condition(&query.filters))
        .to_string(PostgresQueryBuilder)
}

fn delete_statement(table: Table, query: &Query) -> String {
    Sql::delete()
        .from_table(Alias::new(table.name()))
        .cond_where(condition(&query.filters))
        .to_string(PostgresQueryBuilder)
}

fn count_statement(table: Table, query: &Query) -> String {
    Sql::select()
        .expr(Expr::col(Asterisk).count())
        .from(Alias::new(table.name()))
        .cond_where(condition(&query.filters))
        .to_string(PostgresQueryBuilder)
}

fn into_rows(table: Table, docs: Vec<Value>) -> Result<Vec<Row>, StoreError> {
    docs.into_iter()
        .map(|doc| match doc {
            Value::Object(row) => Ok(row),
            other => Err(StoreError::Decode(format!(
                "{table}: expected a row object, got {other}"
            ))),
        })
        .collect()
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError> {
        let sql = select_statement(table, query);
        debug!(%table, sql = %sql, "select");
        let docs = sqlx::query_scalar::<_, Value>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::backend(table, "select", e))?;
        into_rows(table, docs)
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        let Some(sql) = insert_statement(table, &rows)? else {
            return Ok(rows);
        };
        debug!(%table, rows = rows.len(), "insert");
        let docs = sqlx::query_scalar::<_, Value>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::backend(table, "insert", e))?;
        into_rows(table, docs)
    }

    async fn update(&self, table: Table, query: &Query, values: Row) -> Result<u64, StoreError> {
        if !query.is_filtered() {
            return Err(StoreError::Unfiltered { table, op: "update" });
        }
        if values.is_empty() {
            return Ok(0);
        }
        let sql = update_statement(table, query, &values);
        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::backend(table, "update", e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<u64, StoreError> {
        if !query.is_filtered() {
            return Err(StoreError::Unfiltered { table, op: "delete" });
        }
        let sql = delete_statement(table, query);
        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::backend(table, "delete", e))?;
        Ok(result.rows_affected())
    }

    async fn count(&self, table: Table, query: &Query) -> Result<i64, StoreError> {
        let sql = count_statement(table, query);
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::backend(table, "count", e))
    }

    async fn ping(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}
