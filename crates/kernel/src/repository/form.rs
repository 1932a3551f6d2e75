//! Form repository: CRUD plus field/option reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::reconcile::{self, Step};
use super::{changes, find_form};
use crate::access::can_mutate_form;
use crate::error::{AppError, AppResult};
use crate::models::form::resolve_title;
use crate::models::record::{FieldRecord, FormRecord, OptionRecord};
use crate::models::{Field, FieldInput, Form, FormDraft, FormPatch, OptionInput};
use crate::store::{Query, Store, Table, from_rows, to_row};

/// Columns rewritten when a field is updated in place.
const FIELD_COLUMNS: &[&str] = &[
    "type",
    "label",
    "description",
    "required",
    "placeholder",
    "default_value",
    "f_order",
    "properties",
    "updated_at",
];

/// Columns rewritten when an option is updated in place.
const OPTION_COLUMNS: &[&str] = &["value", "description", "f_order", "updated_at"];

/// Repository for forms, their fields and field options.
#[derive(Clone)]
pub struct FormRepository {
    inner: Arc<FormRepositoryInner>,
}

struct FormRepositoryInner {
    store: Arc<dyn Store>,
}

/// Reject option lists on field types that do not take options.
fn validate_fields(fields: &[FieldInput]) -> AppResult<()> {
    for field in fields {
        let has_options = field.options.as_ref().is_some_and(|o| !o.is_empty());
        if has_options && !field.field_type.takes_options() {
            return Err(AppError::validation(format!(
                "Field \"{}\" of type {} does not take options",
                field.label, field.field_type
            )));
        }
    }
    Ok(())
}

/// Group rows by a parent id, keeping their relative order.
fn group_by<T>(rows: Vec<T>, key: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<T>> {
    let mut groups: HashMap<Uuid, Vec<T>> = HashMap::new();
    for row in rows {
        groups.entry(key(&row)).or_default().push(row);
    }
    groups
}

/// Build option records for a freshly created field.
fn new_options(field_id: Uuid, inputs: &[OptionInput]) -> Vec<OptionRecord> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, option)| option.to_record(Uuid::now_v7(), field_id, i as i32))
        .collect()
}

impl FormRepository {
    /// Create a repository over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(FormRepositoryInner { store }),
        }
    }

    fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Load the bare form row, or NotFound.
    pub async fn find_record(&self, form_id: Uuid) -> AppResult<FormRecord> {
        find_form(self.store(), form_id)
            .await?
            .ok_or_else(|| AppError::not_found("Form not found"))
    }

    /// Live response count; a failed count degrades to zero.
    async fn response_count(&self, form_id: Uuid) -> i64 {
        match self
            .store()
            .count(Table::FormResponses, &Query::new().eq("form_id", form_id))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!(form_id = %form_id, error = %e, "failed to count responses");
                0
            }
        }
    }

    /// Load fields (ordered) and their options for the given forms.
    async fn load_fields(&self, form_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<Field>>> {
        if form_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let fields: Vec<FieldRecord> = from_rows(
            self.store()
                .select(
                    Table::FormFields,
                    &Query::new()
                        .is_in("form_id", form_ids.iter().copied())
                        .order_asc("f_order"),
                )
                .await?,
        )?;

        let option_field_ids: Vec<Uuid> = fields
            .iter()
            .filter(|f| f.field_type.takes_options())
            .map(|f| f.id)
            .collect();
        let mut options = if option_field_ids.is_empty() {
            HashMap::new()
        } else {
            let rows: Vec<OptionRecord> = from_rows(
                self.store()
                    .select(
                        Table::FieldOptions,
                        &Query::new()
                            .is_in("field_id", option_field_ids)
                            .order_asc("f_order"),
                    )
                    .await?,
            )?;
            group_by(rows, |o| o.field_id)
        };

        let mut by_form: HashMap<Uuid, Vec<Field>> = HashMap::new();
        for record in fields {
            let field_options = options.remove(&record.id).unwrap_or_default();
            by_form
                .entry(record.form_id)
                .or_default()
                .push(Field::from_record(record, field_options));
        }
        Ok(by_form)
    }

    /// All forms owned by `owner`, most recently updated first.
    pub async fn list_forms(&self, owner: Uuid) -> AppResult<Vec<Form>> {
        let records: Vec<FormRecord> = from_rows(
            self.store()
                .select(
                    Table::Forms,
                    &Query::new().eq("user_id", owner).order_desc("updated_at"),
                )
                .await?,
        )?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut fields = self.load_fields(&ids).await?;

        let mut forms = Vec::with_capacity(records.len());
        for record in records {
            let count = self.response_count(record.id).await;
            let form_fields = fields.remove(&record.id).unwrap_or_default();
            forms.push(Form::from_record(record, form_fields, count));
        }
        Ok(forms)
    }

    /// One fully hydrated form.
    ///
    /// Visibility is not checked here; callers apply `can_view_form`.
    pub async fn get_form(&self, form_id: Uuid) -> AppResult<Form> {
        let record = self.find_record(form_id).await?;
        let fields = self
            .load_fields(&[form_id])
            .await?
            .remove(&form_id)
            .unwrap_or_default();
        let count = self.response_count(form_id).await;
        Ok(Form::from_record(record, fields, count))
    }

    /// Create a form owned by `owner` with the draft's fields in payload order.
    pub async fn create_form(&self, owner: Uuid, draft: FormDraft) -> AppResult<Form> {
        let fields = draft.fields.unwrap_or_default();
        validate_fields(&fields)?;

        let now = Utc::now();
        let record = FormRecord {
            id: Uuid::now_v7(),
            title: resolve_title(draft.title.as_deref()),
            description: draft.description,
            user_id: owner,
            is_public: draft.is_public.unwrap_or(false),
            settings: draft.settings.unwrap_or_default().to_stored(),
            created_at: now,
            updated_at: now,
        };
        let form_id = record.id;
        self.store()
            .insert(Table::Forms, vec![to_row(&record)?])
            .await?;

        if let Err(e) = self.insert_new_fields(form_id, &fields, 0).await {
            // Leave no half-built form behind.
            if let Err(cleanup) = self
                .store()
                .delete(Table::Forms, &Query::new().eq("id", form_id))
                .await
            {
                error!(
                    form_id = %form_id,
                    error = %cleanup,
                    "failed to remove partially created form"
                );
            }
            return Err(e);
        }

        info!(form_id = %form_id, owner = %owner, fields = fields.len(), "form created");
        self.get_form(form_id).await
    }

    /// Insert `inputs` as new fields (with their options) at consecutive
    /// orders starting from `first_order`.
    async fn insert_new_fields(
        &self,
        form_id: Uuid,
        inputs: &[FieldInput],
        first_order: i32,
    ) -> AppResult<()> {
        let placed: Vec<(i32, &FieldInput)> = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| (first_order + i as i32, input))
            .collect();
        self.insert_placed_fields(form_id, &placed).await
    }

    /// Insert fields at explicit orders, then all their options, as two
    /// multi-row statements.
    async fn insert_placed_fields(
        &self,
        form_id: Uuid,
        placed: &[(i32, &FieldInput)],
    ) -> AppResult<()> {
        if placed.is_empty() {
            return Ok(());
        }
        let mut field_rows = Vec::with_capacity(placed.len());
        let mut option_rows = Vec::new();
        for (order, input) in placed {
            let field_id = Uuid::now_v7();
            field_rows.push(to_row(&input.to_record(field_id, form_id, *order))?);
            if input.field_type.takes_options() {
                let options = input.options.as_deref().unwrap_or_default();
                for option in new_options(field_id, options) {
                    option_rows.push(to_row(&option)?);
                }
            }
        }

        self.store().insert(Table::FormFields, field_rows).await?;
        if !option_rows.is_empty() {
            self.store().insert(Table::FieldOptions, option_rows).await?;
        }
        Ok(())
    }

    /// Update a form's attributes and, when the patch carries fields,
    /// reconcile them against the stored ones.
    pub async fn update_form(
        &self,
        form_id: Uuid,
        caller: Uuid,
        patch: FormPatch,
    ) -> AppResult<Form> {
        let mut record = self.find_record(form_id).await?;
        if !can_mutate_form(&record, Some(caller)) {
            return Err(AppError::forbidden(
                "You do not have permission to update this form",
            ));
        }
        if let Some(fields) = &patch.fields {
            validate_fields(fields)?;
        }

        let mut columns = vec!["updated_at"];
        if let Some(title) = patch.title.as_deref() {
            record.title = resolve_title(Some(title));
            columns.push("title");
        }
        if let Some(description) = patch.description {
            record.description = Some(description);
            columns.push("description");
        }
        if let Some(is_public) = patch.is_public {
            record.is_public = is_public;
            columns.push("is_public");
        }
        if let Some(settings) = &patch.settings {
            record.settings = settings.to_stored();
            columns.push("settings");
        }
        record.updated_at = Utc::now();

        self.store()
            .update(
                Table::Forms,
                &Query::new().eq("id", form_id),
                changes(&record, &columns)?,
            )
            .await?;

        if let Some(fields) = &patch.fields {
            self.reconcile_fields(form_id, fields).await?;
        }

        info!(form_id = %form_id, "form updated");
        self.get_form(form_id).await
    }

    /// Bring the stored fields of `form_id` in line with `inputs`.
    async fn reconcile_fields(&self, form_id: Uuid, inputs: &[FieldInput]) -> AppResult<()> {
        let existing: Vec<FieldRecord> = from_rows(
            self.store()
                .select(
                    Table::FormFields,
                    &Query::new().eq("form_id", form_id).order_asc("f_order"),
                )
                .await?,
        )?;
        let existing_ids: Vec<Uuid> = existing.iter().map(|f| f.id).collect();
        let existing_by_id: HashMap<Uuid, &FieldRecord> =
            existing.iter().map(|f| (f.id, f)).collect();
        let incoming: Vec<Option<Uuid>> = inputs.iter().map(FieldInput::parsed_id).collect();

        let plan = reconcile::plan(&existing_ids, &incoming);

        if !plan.delete.is_empty() {
            let deleted = self
                .store()
                .delete(
                    Table::FormFields,
                    &Query::new().is_in("id", plan.delete.iter().copied()),
                )
                .await?;
            info!(form_id = %form_id, deleted, "fields removed");
        }

        let mut created = Vec::new();
        for (input, step) in inputs.iter().zip(&plan.steps) {
            match *step {
                Step::Update { id, order } => {
                    let record = input.to_record(id, form_id, order);
                    self.store()
                        .update(
                            Table::FormFields,
                            &Query::new().eq("id", id),
                            changes(&record, FIELD_COLUMNS)?,
                        )
                        .await?;

                    let had_options = existing_by_id
                        .get(&id)
                        .is_some_and(|f| f.field_type.takes_options());
                    if input.field_type.takes_options() {
                        if let Some(options) = &input.options {
                            self.reconcile_options(id, options).await?;
                        }
                    } else if had_options {
                        self.store()
                            .delete(Table::FieldOptions, &Query::new().eq("field_id", id))
                            .await?;
                    }
                }
                Step::Create { order } => created.push((order, input)),
            }
        }

        self.insert_placed_fields(form_id, &created).await
    }

    /// Bring the stored options of `field_id` in line with `inputs`.
    async fn reconcile_options(&self, field_id: Uuid, inputs: &[OptionInput]) -> AppResult<()> {
        let existing: Vec<OptionRecord> = from_rows(
            self.store()
                .select(
                    Table::FieldOptions,
                    &Query::new().eq("field_id", field_id).order_asc("f_order"),
                )
                .await?,
        )?;
        let existing_ids: Vec<Uuid> = existing.iter().map(|o| o.id).collect();
        let incoming: Vec<Option<Uuid>> = inputs.iter().map(OptionInput::parsed_id).collect();

        let plan = reconcile::plan(&existing_ids, &incoming);

        if !plan.delete.is_empty() {
            self.store()
                .delete(
                    Table::FieldOptions,
                    &Query::new().is_in("id", plan.delete.iter().copied()),
                )
                .await?;
        }

        let mut created = Vec::new();
        for (input, step) in inputs.iter().zip(&plan.steps) {
            match *step {
                Step::Update { id, order } => {
                    let record = input.to_record(id, field_id, order);
                    self.store()
                        .update(
                            Table::FieldOptions,
                            &Query::new().eq("id", id),
                            changes(&record, OPTION_COLUMNS)?,
                        )
                        .await?;
                }
                Step::Create { order } => {
                    created.push(to_row(&input.to_record(Uuid::now_v7(), field_id, order))?);
                }
            }
        }

        if !created.is_empty() {
            self.store().insert(Table::FieldOptions, created).await?;
        }
        Ok(())
    }

    /// Delete a form with its fields, options and responses.
    pub async fn delete_form(&self, form_id: Uuid, caller: Uuid) -> AppResult<()> {
        let record = self.find_record(form_id).await?;
        if !can_mutate_form(&record, Some(caller)) {
            return Err(AppError::forbidden(
                "You do not have permission to delete this form",
            ));
        }

        self.store()
            .delete(Table::Forms, &Query::new().eq("id", form_id))
            .await?;

        info!(form_id = %form_id, "form deleted");
        Ok(())
    }
}
