// Import REST handlers: start, continue, progress, and the one-shot
// admin import.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use lotline_common::types::JobStatus;
use lotline_import::{continue_with_dispatch, run_to_completion};

use crate::auth::check_shared_secret;
use crate::AppState;

#[derive(Deserialize, Default)]
pub struct TriggerRequest {
    #[serde(rename = "importId")]
    pub import_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ProgressQuery {
    #[serde(rename = "importId")]
    pub import_id: Option<String>,
}

/// POST /api/import-data: start a new import over the whole dataset.
pub async fn start_import(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.start_import(state.batch_size).await {
        Ok(outcome) => {
            if !outcome.done {
                spawn_continuation(state.clone(), outcome.job_id);
            }
            Json(json!({
                "success": true,
                "message": "Import process started",
                "importId": outcome.job_id,
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to start import");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to start import"})),
            )
                .into_response()
        }
    }
}

/// POST /api/trigger-import: continue an existing import (or start a new
/// one when no id is supplied). This is the endpoint the continuation
/// dispatcher calls back into, so it honors the shared secret.
pub async fn trigger_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TriggerRequest>,
) -> impl IntoResponse {
    if !check_shared_secret(&headers, state.shared_secret.as_deref()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "Unauthorized"})),
        )
            .into_response();
    }

    let Some(job_id) = body.import_id else {
        // No id: behave like a fresh start.
        return start_import(State(state)).await.into_response();
    };

    let job = match state.coordinator.job(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "error": "Import not found"})),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to load import job");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to process batch"})),
            )
                .into_response();
        }
    };

    match job.status {
        JobStatus::Completed => {
            return Json(json!({"success": true, "message": "Import already completed"}))
                .into_response();
        }
        JobStatus::Failed => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": "Import previously failed"})),
            )
                .into_response();
        }
        JobStatus::Pending | JobStatus::InProgress => {}
    }

    let advanced = match &state.dispatcher {
        Some(dispatcher) => {
            continue_with_dispatch(&state.coordinator, dispatcher.as_ref(), job_id).await
        }
        None => state.coordinator.advance(job_id).await,
    };

    match advanced {
        Ok(outcome) => {
            if !outcome.done() && state.dispatcher.is_none() {
                spawn_continuation(state.clone(), job_id);
            }
            let message = if outcome.done() {
                "Import completed"
            } else {
                "Next batch triggered"
            };
            Json(json!({
                "success": true,
                "message": message,
                "importId": job_id,
            }))
            .into_response()
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to process batch");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to process batch"})),
            )
                .into_response()
        }
    }
}

/// GET /api/import-progress?importId=<id>: last committed state of a job.
pub async fn import_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> impl IntoResponse {
    let Some(raw_id) = query.import_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Import ID is required"})),
        )
            .into_response();
    };

    let Ok(job_id) = raw_id.parse::<Uuid>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Invalid import ID"})),
        )
            .into_response();
    };

    match state.coordinator.job(job_id).await {
        Ok(Some(job)) => Json(json!({
            "success": true,
            "progress": {
                "currentOffset": job.current_offset,
                "totalItems": job.total_items,
                "status": job.status.as_str(),
                "error": job.error,
            },
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Import not found"})),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to check import progress");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to check import progress"})),
            )
                .into_response()
        }
    }
}

/// POST /api/import: one-shot admin import, start and drive to completion
/// in the background, reporting the job id immediately.
pub async fn run_full_import(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.start_import(state.batch_size).await {
        Ok(outcome) => {
            if !outcome.done {
                let driver_state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        run_to_completion(&driver_state.coordinator, outcome.job_id).await
                    {
                        error!(job_id = %outcome.job_id, error = %e, "Full import run failed");
                    }
                });
            }
            Json(json!({
                "success": true,
                "message": "Import running",
                "importId": outcome.job_id,
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Import failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Import failed"})),
            )
                .into_response()
        }
    }
}

/// Keep a not-yet-finished job moving without tying up the request:
/// dispatch once when a dispatcher is configured, otherwise run the driver
/// loop in the background.
fn spawn_continuation(state: Arc<AppState>, job_id: Uuid) {
    tokio::spawn(async move {
        match &state.dispatcher {
            Some(dispatcher) => {
                if let Err(e) = dispatcher.dispatch(job_id).await {
                    error!(job_id = %job_id, error = %e, "Continuation dispatch failed, failing job");
                    if let Err(fail_err) = state
                        .coordinator
                        .fail_job(job_id, &format!("continuation dispatch failed: {e}"))
                        .await
                    {
                        error!(job_id = %job_id, error = %fail_err, "Could not mark job failed");
                    }
                }
            }
            None => match run_to_completion(&state.coordinator, job_id).await {
                Ok(outcome) => {
                    info!(job_id = %job_id, status = %outcome.status, "Background import finished")
                }
                Err(e) => error!(job_id = %job_id, error = %e, "Background import failed"),
            },
        }
    });
}
