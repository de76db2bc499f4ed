//! Admin API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EventFilter, EventStatus, ParticipationMode, ResolutionMode};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Draft of a new event, sent once the administrator confirms creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateEventRequest {
    pub title: String,
    /// Ordered prize descriptors. The first `prize_count` entries are handed out.
    pub prize_pool: Vec<String>,
    pub prize_count: u32,
    pub trigger: TriggerSpec,
    pub participation: ParticipationSpec,
}

/// Resolution trigger of a draft event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerSpec {
    /// Draw at a wall-clock instant, written as `YYYYMMDD-HH:MM` in the
    /// server's configured time zone.
    ByTime { draw_at: String },
    /// Draw as soon as this many users have joined.
    ByCount { participants: u32 },
}

/// Participation channel of a draft event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ParticipationSpec {
    Keyword { keyword: String },
    Direct,
}

/// Query parameters for listing events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListEventsQuery {
    #[serde(default)]
    pub filter: EventFilter,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub prize_pool: Vec<String>,
    pub prize_count: u32,
    pub resolution_mode: ResolutionMode,
    /// Deadline in the configured zone (`YYYYMMDD-HH:MM`), for `by_time` events.
    pub draw_at: Option<String>,
    pub draw_at_unix: Option<i64>,
    /// Threshold, for `by_count` events.
    pub required_participants: Option<u32>,
    pub participation_mode: ParticipationMode,
    pub keyword: Option<String>,
    pub participant_count: u64,
    pub status: EventStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub user_id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerResponse {
    pub user_id: i64,
    pub display_name: String,
    pub prize: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetailResponse {
    pub event: EventResponse,
    pub participants: Vec<ParticipantResponse>,
    pub winners: Vec<WinnerResponse>,
}

/// Result of a manual draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResponse {
    pub event: EventResponse,
    pub winners: Vec<WinnerResponse>,
    /// `false` when the event had already been drawn and the stored result is returned.
    pub newly_resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseOutcome {
    Cancelled,
    AlreadyResolved,
    AlreadyCancelled,
}

/// Result of an administrative close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseResponse {
    pub event: EventResponse,
    pub outcome: CloseOutcome,
}

/// An armed deadline held by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub event_id: Uuid,
    pub fire_at: i64,
    pub fire_at_local: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_request_parsing() {
        let json = r#"{
            "title": "Weekend giveaway",
            "prize_pool": ["A", "B", "C"],
            "prize_count": 2,
            "trigger": {"mode": "by_time", "draw_at": "20261231-20:00"},
            "participation": {"mode": "keyword", "keyword": "lucky"}
        }"#;
        let request: ActivateEventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.trigger,
            TriggerSpec::ByTime {
                draw_at: "20261231-20:00".to_string()
            }
        );
        assert_eq!(
            request.participation,
            ParticipationSpec::Keyword {
                keyword: "lucky".to_string()
            }
        );

        let direct: ParticipationSpec = serde_json::from_str(r#"{"mode": "direct"}"#).unwrap();
        assert_eq!(direct, ParticipationSpec::Direct);
    }

    #[test]
    fn test_list_query_defaults_to_all() {
        let query: ListEventsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.filter, EventFilter::All);
    }
}
