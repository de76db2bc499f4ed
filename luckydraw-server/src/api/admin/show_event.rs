use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use luckydraw_sdk::objects::EventDetailResponse;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::api::{event_response, participant_response, winner_response};
use crate::state::AppState;

use super::AdminApiError;

/// `GET /events/{event_id}`: one event with its participants and winners.
pub async fn show_event(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let tz = state.config.draw.read().await.timezone;
    let event = state
        .store
        .get_event(event_id)
        .await?
        .ok_or(AdminApiError::NotFound(event_id))?;
    let participants = state.store.list_participants(event_id).await?;
    let winners = state.store.list_winners(event_id).await?;

    Ok(Json(EventDetailResponse {
        event: event_response(&event, participants.len() as u64, tz),
        participants: participants.iter().map(participant_response).collect(),
        winners: winners.iter().map(winner_response).collect(),
    }))
}
