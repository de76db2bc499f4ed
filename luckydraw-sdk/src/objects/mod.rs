pub mod admin;
pub mod gateway;
pub mod notification;

pub use admin::{
    ActivateEventRequest, CloseOutcome, CloseResponse, DrawResponse, EventDetailResponse, EventResponse, ListEventsQuery,
    ParticipantResponse, ParticipationSpec, TriggerResponse, TriggerSpec, WinnerResponse,
};
pub use gateway::{
    DrawOutcome, DrawSummary, HistoryRequest, HistoryResponse, JoinRequest, JoinResponse,
    JoinResultEntry, JoinStatus, PrizeWonResponse,
};
pub use notification::NotificationPayload;

use serde::{Deserialize, Serialize};

/// How an event decides when to draw.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `luckydraw-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    ByTime,
    ByCount,
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionMode::ByTime => write!(f, "by_time"),
            ResolutionMode::ByCount => write!(f, "by_count"),
        }
    }
}

/// How users register for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationMode {
    /// Send the keyword in the group chat.
    Keyword,
    /// Send a bare join command in a direct chat with the bot.
    Direct,
}

impl std::fmt::Display for ParticipationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipationMode::Keyword => write!(f, "keyword"),
            ParticipationMode::Direct => write!(f, "direct"),
        }
    }
}

/// Where a join command was sent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatContext {
    Group,
    Direct,
}

/// Lifecycle status of an event as shown to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Open,
    Resolved,
    Cancelled,
}

/// Which events a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
    #[default]
    All,
    /// Neither resolved nor cancelled.
    Open,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResolutionMode::ByCount).unwrap(),
            "\"by_count\""
        );
        assert_eq!(
            serde_json::from_str::<EventFilter>("\"open\"").unwrap(),
            EventFilter::Open
        );
        assert_eq!(ParticipationMode::Keyword.to_string(), "keyword");
    }
}
