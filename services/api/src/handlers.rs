//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for session
//! management. It uses `utoipa` doc comments to generate OpenAPI
//! documentation, and maps the core's typed session errors onto HTTP
//! statuses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use therasim_core::SessionError;
use tracing::error;
use uuid::Uuid;

use crate::{
    models::{
        CreateSessionPayload, ErrorResponse, FeedbackResponse, SessionCreatedResponse,
        SessionView, StudentMessagePayload, StudentReplyResponse,
    },
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(message) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoActiveSession(id) => {
                Self::NotFound(format!("no active session with id {id}"))
            }
            SessionError::SessionEnded => Self::Conflict("session has already ended".to_string()),
            SessionError::Generation(cause) => Self::BadGateway(cause.to_string()),
            other @ SessionError::InvalidTransition { .. } => {
                Self::InternalServerError(other.into())
            }
        }
    }
}

/// Create a new training session and receive the patient's opening line.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created successfully", body = SessionCreatedResponse),
        (status = 502, description = "Generation service unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let started = state
        .orchestrator
        .start_session(payload.into_profile())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id: started.id,
            opening: started.opening,
        }),
    ))
}

/// Post one student message and receive the patient's reply, or the final
/// report when the message was a stop command (`exit`/`quit`).
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    request_body = StudentMessagePayload,
    responses(
        (status = 200, description = "Patient reply or end-of-session report", body = StudentReplyResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session has already ended", body = ErrorResponse),
        (status = 502, description = "Generation service unavailable", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudentMessagePayload>,
) -> Result<Json<StudentReplyResponse>, ApiError> {
    let outcome = state
        .orchestrator
        .post_student_message(id, &payload.message)
        .await?;
    Ok(Json(outcome.into()))
}

/// End the session and receive the performance report. Idempotent: repeat
/// calls return the same report without re-running the evaluation.
#[utoipa::path(
    post,
    path = "/sessions/{id}/end",
    responses(
        (status = 200, description = "Performance report", body = FeedbackResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 502, description = "Generation service unavailable", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let report = state.orchestrator.end_session(id).await?;
    Ok(Json(FeedbackResponse { report }))
}

/// Get a read-only view of a session, transcript included.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let snapshot = state.orchestrator.snapshot(id).await?;
    Ok(Json(snapshot.into()))
}
