//! Form routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::Envelope;
use crate::access::can_view_form;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, MaybeCaller, RequireCaller, parse_id};
use crate::models::{Form, FormDraft, FormPatch};
use crate::state::AppState;

const FORM_NOT_FOUND: &str = "Form not found";

async fn list_forms(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
) -> AppResult<Json<Envelope<Vec<Form>>>> {
    let forms = state.forms().list_forms(caller.id()).await?;
    Ok(Json(Envelope::data(forms)))
}

async fn create_form(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    ApiJson(draft): ApiJson<FormDraft>,
) -> AppResult<(StatusCode, Json<Envelope<Form>>)> {
    let form = state.forms().create_form(caller.id(), draft).await?;
    Ok((StatusCode::CREATED, Json(Envelope::data(form))))
}

async fn get_form(
    State(state): State<AppState>,
    caller: MaybeCaller,
    Path(id): Path<String>,
) -> AppResult<Json<Envelope<Form>>> {
    let form_id = parse_id(&id, FORM_NOT_FOUND)?;
    let form = state.forms().get_form(form_id).await?;
    if !can_view_form(&form, caller.id()) {
        return Err(AppError::forbidden(
            "You do not have permission to view this form",
        ));
    }
    Ok(Json(Envelope::data(form)))
}

async fn update_form(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<FormPatch>,
) -> AppResult<Json<Envelope<Form>>> {
    let form_id = parse_id(&id, FORM_NOT_FOUND)?;
    let form = state.forms().update_form(form_id, caller.id(), patch).await?;
    Ok(Json(Envelope::data(form)))
}

async fn delete_form(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<String>,
) -> AppResult<Json<Envelope<()>>> {
    let form_id = parse_id(&id, FORM_NOT_FOUND)?;
    state.forms().delete_form(form_id, caller.id()).await?;
    Ok(Json(Envelope::message("Form deleted successfully")))
}

/// Create the form router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/forms", get(list_forms).post(create_form))
        .route(
            "/forms/{id}",
            get(get_form).put(update_form).delete(delete_form),
        )
}
