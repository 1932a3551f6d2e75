//! Response routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::Envelope;
use crate::error::AppResult;
use crate::extract::{ApiJson, MaybeCaller, RequireCaller, parse_id};
use crate::models::{Answers, FormResponse, SubmitReceipt};
use crate::state::AppState;

async fn submit_response(
    State(state): State<AppState>,
    caller: MaybeCaller,
    Path(id): Path<String>,
    ApiJson(answers): ApiJson<Answers>,
) -> AppResult<(StatusCode, Json<Envelope<SubmitReceipt>>)> {
    let form_id = parse_id(&id, "Form not found")?;
    let receipt = state
        .responses()
        .submit_response(form_id, answers, caller.id())
        .await?;
    Ok((StatusCode::CREATED, Json(Envelope::data(receipt))))
}

async fn list_responses(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<String>,
) -> AppResult<Json<Envelope<Vec<FormResponse>>>> {
    let form_id = parse_id(&id, "Form not found")?;
    let responses = state.responses().list_responses(form_id, caller.id()).await?;
    Ok(Json(Envelope::data(responses)))
}

async fn get_response(
    State(state): State<AppState>,
    caller: MaybeCaller,
    Path(id): Path<String>,
) -> AppResult<Json<Envelope<FormResponse>>> {
    let response_id = parse_id(&id, "Response not found")?;
    let response = state
        .responses()
        .get_response(response_id, caller.id())
        .await?;
    Ok(Json(Envelope::data(response)))
}

async fn delete_response(
    State(state): State<AppState>,
    RequireCaller(caller): RequireCaller,
    Path(id): Path<String>,
) -> AppResult<Json<Envelope<()>>> {
    let response_id = parse_id(&id, "Response not found")?;
    state
        .responses()
        .delete_response(response_id, caller.id())
        .await?;
    Ok(Json(Envelope::message("Response deleted successfully")))
}

/// Create the response router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/forms/{id}/responses",
            get(list_responses).post(submit_response),
        )
        .route("/responses/{id}", get(get_response).delete(delete_response))
}
