//! HTTP API.
//!
//! - `/admin/*`: administrator commands, authenticated by [`extractors::AdminAuth`]
//! - `/gateway/*`: chat gateway commands, authenticated by [`extractors::SignedBody`]

pub mod admin;
pub mod extractors;
pub mod gateway;

use axum::Router;
use luckydraw_core::entities::{DrawEvent, Participant, WinnerAssignment};
use luckydraw_core::store::{EventStore, StoreError};
use luckydraw_core::utils::trigger_time::format_trigger_time;
use luckydraw_sdk::objects::{EventResponse, ParticipantResponse, WinnerResponse};
use time_tz::Tz;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/admin", admin::router())
        .nest("/gateway", gateway::router())
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub(crate) fn event_response(event: &DrawEvent, participant_count: u64, tz: &Tz) -> EventResponse {
    let draw_at = event.draw_at();
    EventResponse {
        id: event.id,
        title: event.title.clone(),
        prize_pool: event.prize_pool.clone(),
        prize_count: event.prize_count,
        resolution_mode: event.resolution_mode().into(),
        draw_at: draw_at.map(|at| format_trigger_time(at, tz)),
        draw_at_unix: draw_at.map(|at| at.unix_timestamp()),
        required_participants: event.required_participants(),
        participation_mode: event.participation_mode().into(),
        keyword: event.keyword().map(str::to_string),
        participant_count,
        status: event.status(),
        created_at: event.created_at.unix_timestamp(),
    }
}

/// [`event_response`] with the participant count read from the store.
pub(crate) async fn counted_event_response(
    store: &dyn EventStore,
    event: &DrawEvent,
    tz: &Tz,
) -> Result<EventResponse, StoreError> {
    let count = store.count_participants(event.id).await?;
    Ok(event_response(event, count, tz))
}

pub(crate) fn winner_response(winner: &WinnerAssignment) -> WinnerResponse {
    WinnerResponse {
        user_id: winner.user_id,
        display_name: winner.display_name.clone(),
        prize: winner.prize.clone(),
    }
}

pub(crate) fn participant_response(participant: &Participant) -> ParticipantResponse {
    ParticipantResponse {
        user_id: participant.user_id,
        display_name: participant.display_name.clone(),
    }
}
