//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CreateSessionPayload, ErrorResponse, FeedbackResponse, SessionCreatedResponse,
        SessionView, StudentMessagePayload, StudentReplyResponse, TurnView,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::post_message,
        handlers::end_session,
        handlers::get_session,
    ),
    components(
        schemas(
            CreateSessionPayload,
            SessionCreatedResponse,
            StudentMessagePayload,
            StudentReplyResponse,
            FeedbackResponse,
            SessionView,
            TurnView,
            ErrorResponse
        )
    ),
    tags(
        (name = "Therasim API", description = "Session management for the psychotherapy training simulator")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/messages", post(handlers::post_message))
        .route("/sessions/{id}/end", post(handlers::end_session))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
