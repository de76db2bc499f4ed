use axum::{Json, extract::State, response::IntoResponse};
use luckydraw_sdk::objects::{HistoryRequest, HistoryResponse, PrizeWonResponse};

use crate::api::counted_event_response;
use crate::api::extractors::SignedBody;
use crate::state::AppState;

use super::GatewayApiError;

/// `POST /history`: events the user joined and prizes they won.
pub async fn history(
    State(state): State<AppState>,
    SignedBody(request): SignedBody<HistoryRequest>,
) -> Result<impl IntoResponse, GatewayApiError> {
    let tz = state.config.draw.read().await.timezone;
    let joined_events = state.store.list_events_joined_by(request.user_id).await?;
    let won = state.store.list_wins_for_user(request.user_id).await?;

    let mut joined = Vec::with_capacity(joined_events.len());
    for event in &joined_events {
        joined.push(counted_event_response(state.store.as_ref(), event, tz).await?);
    }

    Ok(Json(HistoryResponse {
        joined,
        won: won
            .into_iter()
            .map(|prize| PrizeWonResponse {
                event_id: prize.event_id,
                title: prize.title,
                prize: prize.prize,
            })
            .collect(),
    }))
}
