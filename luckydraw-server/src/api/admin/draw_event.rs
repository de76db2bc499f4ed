use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use luckydraw_core::processors::DrawError;
use luckydraw_sdk::objects::DrawResponse;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::api::{counted_event_response, winner_response};
use crate::state::AppState;

use super::AdminApiError;

/// `POST /events/{event_id}/draw`: draw now, regardless of the trigger.
///
/// Drawing an already resolved event returns the stored winners with
/// `newly_resolved: false`.
pub async fn draw_event(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let tz = state.config.draw.read().await.timezone;
    let result = state.engine.resolve(event_id).await;

    if matches!(
        result,
        Ok(_) | Err(DrawError::InsufficientParticipants { .. })
    ) {
        state.scheduler.disarm(event_id);
    }
    let resolution = result?;
    tracing::info!(
        event_id = %event_id,
        newly_resolved = resolution.newly_resolved,
        "Manual draw"
    );

    Ok(Json(DrawResponse {
        event: counted_event_response(state.store.as_ref(), &resolution.event, tz).await?,
        winners: resolution.winners.iter().map(winner_response).collect(),
        newly_resolved: resolution.newly_resolved,
    }))
}
