use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use luckydraw_core::store::CancelOutcome;
use luckydraw_sdk::objects::{CloseOutcome, CloseResponse};
use uuid::Uuid;

use crate::api::counted_event_response;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

/// `POST /events/{event_id}/close`: cancel an open event and drop its timer.
///
/// Closing a resolved or already cancelled event changes nothing; the
/// outcome says which.
pub async fn close_event(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let tz = state.config.draw.read().await.timezone;
    let outcome = match state.scheduler.close(event_id).await? {
        CancelOutcome::Cancelled => CloseOutcome::Cancelled,
        CancelOutcome::AlreadyResolved => CloseOutcome::AlreadyResolved,
        CancelOutcome::AlreadyCancelled => CloseOutcome::AlreadyCancelled,
    };

    let event = state
        .store
        .get_event(event_id)
        .await?
        .ok_or(AdminApiError::NotFound(event_id))?;

    Ok(Json(CloseResponse {
        event: counted_event_response(state.store.as_ref(), &event, tz).await?,
        outcome,
    }))
}
