use axum::{Json, extract::State, response::IntoResponse};
use luckydraw_core::processors::{DrawError, JoinAttempt, Resolution};
use luckydraw_sdk::objects::{
    DrawOutcome, DrawSummary, JoinRequest, JoinResponse, JoinResultEntry,
};

use crate::api::extractors::SignedBody;
use crate::api::winner_response;
use crate::state::AppState;

use super::GatewayApiError;

/// `POST /join`: offer a join command to one event, or to every open event.
///
/// Events the command was not meant for are left out of the response. A
/// join that reaches a `by_count` threshold carries the draw it triggered.
pub async fn join(
    State(state): State<AppState>,
    SignedBody(request): SignedBody<JoinRequest>,
) -> Result<impl IntoResponse, GatewayApiError> {
    let keyword = request.keyword.as_deref();

    let attempts = match request.event_id {
        Some(event_id) => match state.store.get_event(event_id).await? {
            Some(event) => state
                .gate
                .attempt(
                    event,
                    request.user_id,
                    &request.display_name,
                    keyword,
                    request.context,
                )
                .await
                .into_iter()
                .collect(),
            None => Vec::new(),
        },
        None => {
            state
                .gate
                .join_open_events(
                    request.user_id,
                    &request.display_name,
                    keyword,
                    request.context,
                )
                .await?
        }
    };

    if attempts.is_empty() {
        tracing::debug!(user_id = request.user_id, "Join matched no event");
    }

    Ok(Json(JoinResponse {
        results: attempts.into_iter().map(to_entry).collect(),
    }))
}

fn to_entry(attempt: JoinAttempt) -> JoinResultEntry {
    JoinResultEntry {
        event_id: attempt.event.id,
        title: attempt.event.title,
        status: attempt.status,
        participant_count: attempt.participant_count,
        draw: attempt.draw.map(draw_summary),
    }
}

fn draw_summary(draw: Result<Resolution, DrawError>) -> DrawSummary {
    match draw {
        Ok(resolution) => DrawSummary {
            outcome: DrawOutcome::Resolved,
            winners: resolution.winners.iter().map(winner_response).collect(),
        },
        Err(DrawError::InsufficientParticipants { .. }) => DrawSummary {
            outcome: DrawOutcome::InsufficientParticipants,
            winners: Vec::new(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Threshold draw failed");
            DrawSummary {
                outcome: DrawOutcome::Failed,
                winners: Vec::new(),
            }
        }
    }
}
