// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routes. The transport stays thin: parse the multipart request, run
// the pipeline on the blocking pool, and shape the outcome into a download
// or a structured error payload.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bildwerk_core::error::BildwerkError;
use bildwerk_core::{InputFile, ServerConfig};
use bildwerk_pipeline::batch::{BatchOutcome, run_batch};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::upload;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = (state.config.max_file_bytes as usize)
        .saturating_mul(state.config.max_files.max(1));

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/api/convert", post(convert_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[instrument(skip_all)]
async fn convert_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let job = upload::parse_request(&mut multipart, &state.config).await?;
    info!(
        files = job.files.len(),
        format = ?job.target.format,
        target_bytes = ?job.target.target_bytes,
        "conversion request"
    );

    let tuning = state.config.search.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let inputs: Vec<InputFile> = job
            .files
            .iter()
            .map(|file| InputFile {
                original_name: file.original_name.clone(),
                path: file.temp.path().to_path_buf(),
            })
            .collect();
        // `job` (and with it every spooled temp file) is dropped when this
        // closure returns, on success and failure alike.
        run_batch(&inputs, &job.target, &job.crops, &tuning)
    })
    .await
    .map_err(|err| HttpError::internal(format!("worker task failed: {}", err)))??;

    Ok(build_response(outcome))
}

fn build_response(outcome: BatchOutcome) -> Response {
    match outcome {
        BatchOutcome::Single(result) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, result.mime_type),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", result.filename),
                ),
            ],
            result.bytes,
        )
            .into_response(),
        BatchOutcome::Archive { bytes, entry_count } => {
            info!(entry_count, "sending zip archive");
            let filename = format!("converted_{}.zip", Uuid::new_v4().simple());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
    }
}

/// Error payload shaping: a structured `{"error": ...}` body with a status
/// mapped from the error class, never partial file content.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<BildwerkError> for HttpError {
    fn from(err: BildwerkError) -> Self {
        match &err {
            BildwerkError::UploadRejected(_)
            | BildwerkError::DecodeFailed(_)
            | BildwerkError::UnsupportedConversion(_)
            | BildwerkError::AllInputsFailed => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            BildwerkError::CapabilityUnavailable(_) => {
                Self::new(StatusCode::NOT_IMPLEMENTED, err.to_string())
            }
            // Internal failures get a generic message; details stay in logs.
            _ => {
                tracing::error!(error = %err, "conversion failed");
                Self::internal("internal server error")
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(json!({"error": self.message}));
        (self.status, body).into_response()
    }
}
