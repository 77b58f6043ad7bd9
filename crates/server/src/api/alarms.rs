//! `/alarms` endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use reminder_core::{Alarm, NewAlarm};

use crate::auth::Owner;
use crate::error::{ApiError, ApiResult, MessageResponse};
use crate::state::AppState;

pub async fn create_alarm(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    body: Result<Json<NewAlarm>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Alarm>)> {
    let Json(request) = body.map_err(|e| {
        tracing::debug!(error = %e, "rejected alarm body");
        ApiError::bad_request("invalid request body")
    })?;

    let alarm = state.alarms.create(&owner, request).await?;
    Ok((StatusCode::CREATED, Json(alarm)))
}

pub async fn list_alarms(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> ApiResult<Json<Vec<Alarm>>> {
    Ok(Json(state.alarms.list(&owner).await?))
}

pub async fn delete_alarm(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.alarms.delete(&owner, &id).await?;
    Ok(Json(MessageResponse::new("ok")))
}
