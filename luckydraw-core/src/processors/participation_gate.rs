//! ParticipationGate.
//!
//! Decides whether a `/join` command registers a user for an event, and
//! resolves `by_count` events synchronously once the join reaches the
//! threshold. The joiner is already recorded at that point, so they are
//! eligible in the draw their join triggered.

use crate::entities::{DrawEvent, Participant, Participation, ResolutionTrigger};
use crate::processors::resolution_engine::{DrawError, Resolution, ResolutionEngine};
use crate::store::{EventStore, StoreError};
use luckydraw_sdk::objects::{ChatContext, EventFilter, JoinStatus};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    #[error("event {0} is no longer open")]
    EventNotOpen(Uuid),

    /// Callers skip this silently unless `wrong_context` is set, in which
    /// case the user sent the right command from the wrong kind of chat.
    #[error("join does not match the participation channel of event {event_id}")]
    WrongParticipationChannel { event_id: Uuid, wrong_context: bool },

    #[error("user {user_id} already joined event {event_id}")]
    AlreadyJoined { event_id: Uuid, user_id: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// A successful join.
#[derive(Debug)]
pub struct JoinOutcome {
    pub event: DrawEvent,
    /// Participants after this join.
    pub participant_count: u64,
    /// Set when this join reached the `by_count` threshold.
    pub draw: Option<Result<Resolution, DrawError>>,
}

/// One event's answer to a join offered to every open event.
#[derive(Debug)]
pub struct JoinAttempt {
    pub event: DrawEvent,
    pub status: JoinStatus,
    pub participant_count: Option<u64>,
    pub draw: Option<Result<Resolution, DrawError>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelMatch {
    Accepted,
    /// Right command, wrong kind of chat.
    WrongContext,
    /// The command is not meant for this event.
    Unrelated,
}

fn match_channel(event: &DrawEvent, keyword: Option<&str>, context: ChatContext) -> ChannelMatch {
    let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
    match (&event.participation, keyword) {
        (Participation::Keyword(expected), Some(given)) if expected == given => match context {
            ChatContext::Group => ChannelMatch::Accepted,
            ChatContext::Direct => ChannelMatch::WrongContext,
        },
        (Participation::Direct, None) => match context {
            ChatContext::Direct => ChannelMatch::Accepted,
            ChatContext::Group => ChannelMatch::WrongContext,
        },
        _ => ChannelMatch::Unrelated,
    }
}

pub struct ParticipationGate {
    store: Arc<dyn EventStore>,
    engine: Arc<ResolutionEngine>,
}

impl ParticipationGate {
    pub fn new(store: Arc<dyn EventStore>, engine: Arc<ResolutionEngine>) -> Self {
        Self { store, engine }
    }

    /// Register `user_id` for one event.
    pub async fn join(
        &self,
        event_id: Uuid,
        user_id: i64,
        display_name: &str,
        keyword: Option<&str>,
        context: ChatContext,
    ) -> Result<JoinOutcome, JoinError> {
        let (event, participant_count) = {
            let _guard = self.engine.lock_event(event_id).await;

            let event = self
                .store
                .get_event(event_id)
                .await?
                .ok_or(JoinError::EventNotFound(event_id))?;
            if !event.is_open() {
                return Err(JoinError::EventNotOpen(event_id));
            }
            match match_channel(&event, keyword, context) {
                ChannelMatch::Accepted => {}
                mismatch => {
                    return Err(JoinError::WrongParticipationChannel {
                        event_id,
                        wrong_context: mismatch == ChannelMatch::WrongContext,
                    });
                }
            }
            if self.store.has_participant(event_id, user_id).await? {
                return Err(JoinError::AlreadyJoined { event_id, user_id });
            }

            let participant = Participant {
                event_id,
                user_id,
                display_name: display_name.to_string(),
            };
            match self.store.add_participant(&participant).await {
                Ok(()) => {}
                Err(StoreError::DuplicateParticipant { .. }) => {
                    return Err(JoinError::AlreadyJoined { event_id, user_id });
                }
                Err(StoreError::EventNotFound(_)) => {
                    return Err(JoinError::EventNotFound(event_id));
                }
                Err(e) => return Err(e.into()),
            }
            let count = self.store.count_participants(event_id).await?;
            (event, count)
        };

        info!(
            event_id = %event_id,
            user_id,
            participant_count,
            "Participant joined"
        );

        // `>=` rather than `==`: a threshold passed by a racing join still draws.
        let draw = match event.trigger {
            ResolutionTrigger::ByCount { required } if participant_count >= u64::from(required) => {
                debug!(event_id = %event_id, required, "Threshold reached, drawing");
                Some(self.engine.resolve(event_id).await)
            }
            _ => None,
        };

        Ok(JoinOutcome {
            event,
            participant_count,
            draw,
        })
    }

    /// Offer a join command to every open event.
    ///
    /// Events the command is not meant for are skipped. A storage failure on
    /// one event is logged and the remaining events are still tried.
    pub async fn join_open_events(
        &self,
        user_id: i64,
        display_name: &str,
        keyword: Option<&str>,
        context: ChatContext,
    ) -> Result<Vec<JoinAttempt>, StoreError> {
        let open = self.store.list_events(EventFilter::Open).await?;
        let mut attempts = Vec::new();
        for event in open {
            if match_channel(&event, keyword, context) == ChannelMatch::Unrelated {
                continue;
            }
            if let Some(attempt) = self
                .attempt(event, user_id, display_name, keyword, context)
                .await
            {
                attempts.push(attempt);
            }
        }
        Ok(attempts)
    }

    /// Join one event and turn the result into a [`JoinAttempt`].
    ///
    /// Returns `None` when the event should not be mentioned to the user.
    pub async fn attempt(
        &self,
        event: DrawEvent,
        user_id: i64,
        display_name: &str,
        keyword: Option<&str>,
        context: ChatContext,
    ) -> Option<JoinAttempt> {
        let event_id = event.id;
        let (status, participant_count, draw, event) = match self
            .join(event_id, user_id, display_name, keyword, context)
            .await
        {
            Ok(outcome) => (
                JoinStatus::Joined,
                Some(outcome.participant_count),
                outcome.draw,
                outcome.event,
            ),
            Err(JoinError::AlreadyJoined { .. }) => (JoinStatus::AlreadyJoined, None, None, event),
            Err(JoinError::EventNotOpen(_)) => (JoinStatus::NotOpen, None, None, event),
            Err(JoinError::WrongParticipationChannel {
                wrong_context: true,
                ..
            }) => (JoinStatus::WrongChannel, None, None, event),
            Err(JoinError::WrongParticipationChannel { .. }) | Err(JoinError::EventNotFound(_)) => {
                return None;
            }
            Err(JoinError::Storage(e)) => {
                warn!(event_id = %event_id, user_id, error = %e, "Join failed");
                return None;
            }
        };
        Some(JoinAttempt {
            event,
            status,
            participant_count,
            draw,
        })
    }
}
