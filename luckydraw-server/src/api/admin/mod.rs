//! Admin API handlers.
//!
//! These endpoints are called by the administrator's client and require
//! the `LuckyDraw-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `POST /events`             – validate and activate a new event
//! - `GET  /events`             – list events (`?filter=all|open|cancelled`)
//! - `GET  /events/{id}`        – event with participants and winners
//! - `POST /events/{id}/draw`   – draw now
//! - `POST /events/{id}/close`  – cancel an open event
//! - `GET  /triggers`           – armed deadlines

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use luckydraw_core::entities::ActivationError;
use luckydraw_core::processors::DrawError;
use luckydraw_core::store::StoreError;
use uuid::Uuid;

use crate::state::AppState;

mod activate_event;
mod close_event;
mod draw_event;
mod list_events;
mod show_event;
mod show_triggers;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/events",
            post(activate_event::activate_event).get(list_events::list_events),
        )
        .route("/events/{event_id}", get(show_event::show_event))
        .route("/events/{event_id}/draw", post(draw_event::draw_event))
        .route("/events/{event_id}/close", post(close_event::close_event))
        .route("/triggers", get(show_triggers::show_triggers))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    NotFound(Uuid),
    /// The draft was rejected.
    Invalid(ActivationError),
    /// The event is in a state that does not allow the command.
    Conflict(String),
    Storage(StoreError),
}

impl From<StoreError> for AdminApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EventNotFound(id) => AdminApiError::NotFound(id),
            other => AdminApiError::Storage(other),
        }
    }
}

impl From<ActivationError> for AdminApiError {
    fn from(e: ActivationError) -> Self {
        match e {
            ActivationError::Storage(e) => e.into(),
            other => AdminApiError::Invalid(other),
        }
    }
}

impl From<DrawError> for AdminApiError {
    fn from(e: DrawError) -> Self {
        match e {
            DrawError::EventNotFound(id) => AdminApiError::NotFound(id),
            DrawError::Storage(e) => e.into(),
            other @ (DrawError::EventCancelled(_)
            | DrawError::NoParticipants(_)
            | DrawError::InsufficientParticipants { .. }) => {
                AdminApiError::Conflict(other.to_string())
            }
        }
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("event {id} not found")).into_response()
            }
            AdminApiError::Invalid(e) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
            }
            AdminApiError::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            AdminApiError::Storage(e) => {
                tracing::error!(error = %e, "Admin API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
