//! In-memory store.
//!
//! Holds every table as a vector of JSON rows behind a single lock. Used by
//! the integration tests and for running the API without PostgreSQL. Supports
//! one-shot fault injection so tests can exercise partial-failure paths.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{Direction, Filter, Query, Row, Store, StoreError, Table};

/// Store operation kinds, for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    Select,
    Insert,
    Update,
    Delete,
    Count,
}

impl FaultOp {
    fn name(self) -> &'static str {
        match self {
            FaultOp::Select => "select",
            FaultOp::Insert => "insert",
            FaultOp::Update => "update",
            FaultOp::Delete => "delete",
            FaultOp::Count => "count",
        }
    }
}

/// Store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    faults: Mutex<Vec<(Table, FaultOp)>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `op` against `table` fail once.
    pub fn fail_on(&self, table: Table, op: FaultOp) {
        self.faults.lock().push((table, op));
    }

    /// Number of rows currently held in `table`.
    pub fn row_count(&self, table: Table) -> usize {
        self.tables.read().get(&table).map_or(0, Vec::len)
    }

    fn check_fault(&self, table: Table, op: FaultOp) -> Result<(), StoreError> {
        let mut faults = self.faults.lock();
        if let Some(pos) = faults.iter().position(|f| *f == (table, op)) {
            faults.remove(pos);
            return Err(StoreError::backend(table, op.name(), "injected fault"));
        }
        Ok(())
    }
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(column, Value::Null) => row.get(*column).is_none_or(Value::is_null),
        Filter::Eq(column, value) => row.get(*column) == Some(value),
        Filter::In(column, values) => row.get(*column).is_some_and(|v| values.contains(v)),
    })
}

fn timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (timestamp(a), timestamp(b)) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // NULLS LAST for ascending order, as in PostgreSQL.
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn sort_rows(rows: &mut [Row], order: &[(&'static str, Direction)]) {
    rows.sort_by(|a, b| {
        for (column, direction) in order {
            let ord = compare_values(a.get(*column), b.get(*column));
            let ord = match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Remove matching rows from `table` and cascade through child tables.
fn delete_cascading(
    tables: &mut HashMap<Table, Vec<Row>>,
    table: Table,
    filters: &[Filter],
) -> u64 {
    let removed: Vec<Row> = match tables.get_mut(&table) {
        Some(rows) => {
            let (gone, kept): (Vec<Row>, Vec<Row>) = std::mem::take(rows)
                .into_iter()
                .partition(|row| matches(row, filters));
            *rows = kept;
            gone
        }
        None => Vec::new(),
    };

    let ids: Vec<Value> = removed.iter().filter_map(|r| r.get("id").cloned()).collect();
    if !ids.is_empty() {
        for (child, column) in table.cascades() {
            delete_cascading(tables, *child, &[Filter::In(*column, ids.clone())]);
        }
    }

    removed.len() as u64
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.check_fault(table, FaultOp::Select)?;
        let tables = self.tables.read();
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_rows(&mut rows, &query.order);
        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        self.check_fault(table, FaultOp::Insert)?;
        if rows.is_empty() {
            return Ok(rows);
        }
        self.tables
            .write()
            .entry(table)
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn update(&self, table: Table, query: &Query, values: Row) -> Result<u64, StoreError> {
        if !query.is_filtered() {
            return Err(StoreError::Unfiltered { table, op: "update" });
        }
        self.check_fault(table, FaultOp::Update)?;
        let mut tables = self.tables.write();
        let mut affected = 0;
        for row in tables.entry(table).or_default().iter_mut() {
            if matches(row, &query.filters) {
                row.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<u64, StoreError> {
        if !query.is_filtered() {
            return Err(StoreError::Unfiltered { table, op: "delete" });
        }
        self.check_fault(table, FaultOp::Delete)?;
        let mut tables = self.tables.write();
        Ok(delete_cascading(&mut tables, table, &query.filters))
    }

    async fn count(&self, table: Table, query: &Query) -> Result<i64, StoreError> {
        self.check_fault(table, FaultOp::Count)?;
        let tables = self.tables.read();
        let count = tables
            .get(&table)
            .map_or(0, |rows| rows.iter().filter(|r| matches(r, &query.filters)).count());
        Ok(count as i64)
    }

    async fn ping(&self) -> bool {
        true
    }
}
