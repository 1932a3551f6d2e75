//! Response repository: submission, retrieval and deletion of responses.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::find_form;
use crate::access::{
    can_delete_response, can_mutate_response, can_submit_response, can_view_response,
};
use crate::error::{AppError, AppResult};
use crate::models::record::{FieldRecord, FormRecord, ResponseRecord, ValueRecord};
use crate::models::response::{encode_value, is_answered};
use crate::models::{Answers, FormResponse, SubmitReceipt};
use crate::store::{Query, Store, Table, from_row, from_rows, to_row};

/// Repository for form responses and their answer values.
#[derive(Clone)]
pub struct ResponseRepository {
    inner: Arc<ResponseRepositoryInner>,
}

struct ResponseRepositoryInner {
    store: Arc<dyn Store>,
}

/// Check answers against the form's fields (in form order).
///
/// Every key must name a field of the form; every required field must be
/// answered. Reports the first offending key or field.
fn validate_answers(fields: &[FieldRecord], answers: &Answers) -> AppResult<()> {
    let known: HashSet<String> = fields.iter().map(|f| f.id.to_string()).collect();
    if let Some(unknown) = answers.keys().find(|key| !known.contains(*key)) {
        return Err(AppError::validation(format!("Unknown field: {unknown}")));
    }

    if let Some(missing) = fields
        .iter()
        .find(|f| f.required && !is_answered(answers.get(&f.id.to_string())))
    {
        return Err(AppError::validation(format!(
            "Missing required field: {}",
            missing.id
        )));
    }
    Ok(())
}

impl ResponseRepository {
    /// Create a repository over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(ResponseRepositoryInner { store }),
        }
    }

    fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    async fn find_form(&self, form_id: Uuid) -> AppResult<FormRecord> {
        find_form(self.store(), form_id)
            .await?
            .ok_or_else(|| AppError::not_found("Form not found"))
    }

    async fn find_response(&self, response_id: Uuid) -> AppResult<ResponseRecord> {
        let row = self
            .store()
            .select(Table::FormResponses, &Query::new().eq("id", response_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Response not found"))?;
        Ok(from_row(row)?)
    }

    async fn load_values(&self, response_id: Uuid) -> AppResult<Vec<ValueRecord>> {
        let rows = self
            .store()
            .select(
                Table::ResponseValues,
                &Query::new().eq("response_id", response_id),
            )
            .await?;
        Ok(from_rows(rows)?)
    }

    /// Validate and store a submission.
    ///
    /// Nothing is written unless validation passes. If storing the answer
    /// values fails, the response row is deleted again before the error is
    /// returned.
    pub async fn submit_response(
        &self,
        form_id: Uuid,
        answers: Answers,
        caller: Option<Uuid>,
    ) -> AppResult<SubmitReceipt> {
        let form = self.find_form(form_id).await?;
        if !can_submit_response(&form, caller) {
            return Err(AppError::forbidden(
                "This form is not public and you do not have permission to submit responses",
            ));
        }

        let fields: Vec<FieldRecord> = from_rows(
            self.store()
                .select(
                    Table::FormFields,
                    &Query::new().eq("form_id", form_id).order_asc("f_order"),
                )
                .await?,
        )?;
        validate_answers(&fields, &answers)?;

        let now = Utc::now();
        let response = ResponseRecord {
            id: Uuid::now_v7(),
            form_id,
            user_id: caller,
            submitted_at: now,
            created_at: now,
            updated_at: now,
        };
        let response_id = response.id;
        self.store()
            .insert(Table::FormResponses, vec![to_row(&response)?])
            .await?;

        if let Err(e) = self.insert_values(response_id, &fields, &answers).await {
            error!(
                response_id = %response_id,
                error = %e,
                "failed to store response values; removing response"
            );
            self.discard(response_id).await;
            return Err(e);
        }

        info!(form_id = %form_id, response_id = %response_id, "response submitted");
        Ok(SubmitReceipt { response_id })
    }

    /// One value row per answered field, in form field order.
    async fn insert_values(
        &self,
        response_id: Uuid,
        fields: &[FieldRecord],
        answers: &Answers,
    ) -> AppResult<()> {
        let now = Utc::now();
        let mut rows = Vec::new();
        for field in fields {
            let Some(value) = answers.get(&field.id.to_string()).map(encode_value) else {
                continue;
            };
            rows.push(to_row(&ValueRecord {
                id: Uuid::now_v7(),
                response_id,
                field_id: field.id,
                value: Some(value),
                created_at: now,
                updated_at: now,
            })?);
        }
        if !rows.is_empty() {
            self.store().insert(Table::ResponseValues, rows).await?;
        }
        Ok(())
    }

    /// Compensating delete of a response whose values could not be stored.
    async fn discard(&self, response_id: Uuid) {
        if let Err(e) = self
            .store()
            .delete(Table::FormResponses, &Query::new().eq("id", response_id))
            .await
        {
            error!(response_id = %response_id, error = %e, "failed to remove incomplete response");
        }
    }

    /// One response with decoded values.
    ///
    /// Anonymous callers denied access get Unauthenticated, signed-in callers
    /// Forbidden.
    pub async fn get_response(
        &self,
        response_id: Uuid,
        caller: Option<Uuid>,
    ) -> AppResult<FormResponse> {
        let response = self.find_response(response_id).await?;
        let form = self.find_form(response.form_id).await?;

        if !can_view_response(&response, form.user_id, caller) {
            return Err(match caller {
                None => AppError::unauthenticated("Please sign in to view this response"),
                Some(_) => {
                    AppError::forbidden("You do not have permission to view this response")
                }
            });
        }

        let values = self.load_values(response_id).await?;
        Ok(FormResponse::from_record(response, values))
    }

    /// All responses of a form, most recently submitted first.
    ///
    /// A response whose values cannot be loaded is returned with no values.
    pub async fn list_responses(
        &self,
        form_id: Uuid,
        caller: Uuid,
    ) -> AppResult<Vec<FormResponse>> {
        let form = self.find_form(form_id).await?;
        if !can_mutate_response(form.user_id, Some(caller)) {
            return Err(AppError::forbidden(
                "You do not have permission to view responses for this form",
            ));
        }

        let records: Vec<ResponseRecord> = from_rows(
            self.store()
                .select(
                    Table::FormResponses,
                    &Query::new().eq("form_id", form_id).order_desc("submitted_at"),
                )
                .await?,
        )?;

        let mut responses = Vec::with_capacity(records.len());
        for record in records {
            let values = match self.load_values(record.id).await {
                Ok(values) => values,
                Err(e) => {
                    warn!(response_id = %record.id, error = %e, "failed to load response values");
                    Vec::new()
                }
            };
            responses.push(FormResponse::from_record(record, values));
        }
        Ok(responses)
    }

    /// Delete a response and its values.
    pub async fn delete_response(&self, response_id: Uuid, caller: Uuid) -> AppResult<()> {
        let response = self.find_response(response_id).await?;
        let form = self.find_form(response.form_id).await?;
        if !can_delete_response(&response, form.user_id, Some(caller)) {
            return Err(AppError::forbidden(
                "You do not have permission to delete this response",
            ));
        }

        self.store()
            .delete(Table::FormResponses, &Query::new().eq("id", response_id))
            .await?;

        info!(response_id = %response_id, form_id = %form.id, "response deleted");
        Ok(())
    }
}
