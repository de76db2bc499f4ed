use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use luckydraw_core::entities::EventDraft;
use luckydraw_sdk::objects::ActivateEventRequest;

use crate::api::event_response;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

/// `POST /events`: validate a draft and activate it.
///
/// `by_time` deadlines are read in the configured zone and armed right away.
pub async fn activate_event(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(request): Json<ActivateEventRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let tz = state.config.draw.read().await.timezone;
    let draft = EventDraft::from_request(request, tz)?;
    let event = state.scheduler.activate(draft).await?;

    Ok((StatusCode::CREATED, Json(event_response(&event, 0, tz))))
}
