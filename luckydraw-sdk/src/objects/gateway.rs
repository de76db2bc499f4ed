//! Gateway API types.
//!
//! The chat gateway translates chat updates into these signed requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::admin::{EventResponse, WinnerResponse};
use super::ChatContext;
use crate::signature::Signature;

/// A `/join [keyword]` command seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub user_id: i64,
    pub display_name: String,
    #[serde(default)]
    pub keyword: Option<String>,
    pub context: ChatContext,
    /// Restrict the join to one event. When absent every open event is offered.
    #[serde(default)]
    pub event_id: Option<Uuid>,
}

impl Signature for JoinRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Joined,
    AlreadyJoined,
    NotOpen,
    /// The keyword matched but the command came from the wrong kind of chat.
    WrongChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawOutcome {
    Resolved,
    InsufficientParticipants,
    Failed,
}

/// Draw triggered by a join that reached the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawSummary {
    pub outcome: DrawOutcome,
    pub winners: Vec<WinnerResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResultEntry {
    pub event_id: Uuid,
    pub title: String,
    pub status: JoinStatus,
    pub participant_count: Option<u64>,
    pub draw: Option<DrawSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Empty when no open event accepted the command.
    pub results: Vec<JoinResultEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub user_id: i64,
}

impl Signature for HistoryRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeWonResponse {
    pub event_id: Uuid,
    pub title: String,
    pub prize: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub joined: Vec<EventResponse>,
    pub won: Vec<PrizeWonResponse>,
}
