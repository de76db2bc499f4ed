use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use luckydraw_sdk::objects::ListEventsQuery;

use crate::api::counted_event_response;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

/// `GET /events`: events matching the filter, oldest first, with
/// participant counts.
pub async fn list_events(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let tz = state.config.draw.read().await.timezone;
    let events = state.store.list_events(query.filter).await?;

    let mut response = Vec::with_capacity(events.len());
    for event in &events {
        response.push(counted_event_response(state.store.as_ref(), event, tz).await?);
    }
    Ok(Json(response))
}
