use axum::{Json, extract::State, response::IntoResponse};
use luckydraw_core::utils::trigger_time::format_trigger_time;
use luckydraw_sdk::objects::TriggerResponse;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `GET /triggers`: deadlines the scheduler is waiting on, soonest first.
pub async fn show_triggers(State(state): State<AppState>, _auth: AdminAuth) -> impl IntoResponse {
    let tz = state.config.draw.read().await.timezone;

    let response: Vec<TriggerResponse> = state
        .scheduler
        .armed()
        .into_iter()
        .map(|trigger| TriggerResponse {
            event_id: trigger.event_id,
            fire_at: trigger.fire_at.unix_timestamp(),
            fire_at_local: format_trigger_time(trigger.fire_at, tz),
        })
        .collect();

    Json(response)
}
