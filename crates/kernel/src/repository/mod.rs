//! Form and response repositories.
//!
//! Repositories own the multi-statement sequences behind each operation and
//! consult the access policy before mutating or returning data. They reach
//! persistence only through the [`Store`] trait.

pub mod form;
pub mod reconcile;
pub mod response;

pub use form::FormRepository;
pub use response::ResponseRepository;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::record::FormRecord;
use crate::store::{Query, Row, Store, StoreError, Table, from_row, to_row};

/// Load a form row by id.
pub(crate) async fn find_form(store: &dyn Store, id: Uuid) -> AppResult<Option<FormRecord>> {
    let row = store
        .select(Table::Forms, &Query::new().eq("id", id))
        .await?
        .into_iter()
        .next();
    Ok(row.map(from_row).transpose()?)
}

/// Serialize `record` and keep only `columns`, for partial updates.
pub(crate) fn changes(record: &impl Serialize, columns: &[&str]) -> Result<Row, StoreError> {
    let mut row = to_row(record)?;
    row.retain(|column, _| columns.contains(&column.as_str()));
    Ok(row)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn changes_keeps_only_named_columns() {
        let row = changes(&json!({"id": 1, "label": "x", "f_order": 2}), &["label", "f_order"])
            .unwrap();
        assert_eq!(row.len(), 2);
        assert!(!row.contains_key("id"));
    }
}
