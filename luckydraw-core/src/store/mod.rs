//! Durable storage for events, participants and winners.
//!
//! [`EventStore`] is the only owner of durable state. The engine, the
//! scheduler and the gate all go through it; the scheduler's timers are a
//! cache that can be rebuilt from [`EventStore::list_events`] at any time.
//!
//! Two implementations are provided:
//!
//! - [`PgEventStore`]: PostgreSQL through the `kanau` processors in
//!   [`crate::entities`].
//! - [`MemoryEventStore`]: process-local maps, for tests and database-less
//!   runs.

mod memory;
mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

use crate::entities::{DrawEvent, Participant, PrizeWon, WinnerAssignment};
use async_trait::async_trait;
use luckydraw_sdk::objects::EventFilter;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    #[error("user {user_id} already joined event {event_id}")]
    DuplicateParticipant { event_id: Uuid, user_id: i64 },

    #[error("user {user_id} already holds a prize in event {event_id}")]
    DuplicateWinner { event_id: Uuid, user_id: i64 },

    #[error("event {event_id} is resolved and can no longer be changed")]
    EventResolved { event_id: Uuid },

    #[error("event {event_id} has not been resolved")]
    EventNotResolved { event_id: Uuid },

    #[error("corrupt record for event {event_id}: {reason}")]
    Corrupt { event_id: Uuid, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of [`EventStore::commit_resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Winners written and `resolved` set.
    Committed,
    /// Nothing written; another resolution got there first.
    AlreadyResolved,
    /// Nothing written; the event was cancelled.
    AlreadyCancelled,
}

/// Result of [`EventStore::mark_cancelled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyResolved,
    AlreadyCancelled,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, event_id: Uuid) -> Result<Option<DrawEvent>, StoreError>;

    /// Insert or overwrite an event. Fails with [`StoreError::EventResolved`]
    /// when the stored copy is already resolved.
    async fn put_event(&self, event: &DrawEvent) -> Result<(), StoreError>;

    /// Events matching `filter`, oldest first.
    async fn list_events(&self, filter: EventFilter) -> Result<Vec<DrawEvent>, StoreError>;

    /// Fails with [`StoreError::DuplicateParticipant`] when the user already
    /// joined and [`StoreError::EventNotFound`] when the event is unknown.
    async fn add_participant(&self, participant: &Participant) -> Result<(), StoreError>;

    async fn count_participants(&self, event_id: Uuid) -> Result<u64, StoreError>;

    /// Participants in join order.
    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<Participant>, StoreError>;

    async fn has_participant(&self, event_id: Uuid, user_id: i64) -> Result<bool, StoreError>;

    /// Append one winner row to an already resolved event.
    ///
    /// Repair path only: a draw writes its winners through
    /// [`commit_resolution`](Self::commit_resolution). Fails with
    /// [`StoreError::EventNotResolved`] while the event is unresolved.
    async fn add_winner(&self, winner: &WinnerAssignment) -> Result<(), StoreError>;

    /// Winners in prize order.
    async fn list_winners(&self, event_id: Uuid) -> Result<Vec<WinnerAssignment>, StoreError>;

    /// Atomically write `winners` and set `resolved`, after re-checking that
    /// the event is neither resolved nor cancelled.
    async fn commit_resolution(
        &self,
        event_id: Uuid,
        winners: &[WinnerAssignment],
    ) -> Result<CommitOutcome, StoreError>;

    /// Set `cancelled` if the event is neither resolved nor cancelled.
    async fn mark_cancelled(&self, event_id: Uuid) -> Result<CancelOutcome, StoreError>;

    /// Events `user_id` has joined, oldest first.
    async fn list_events_joined_by(&self, user_id: i64) -> Result<Vec<DrawEvent>, StoreError>;

    /// Prizes `user_id` has won, oldest event first.
    async fn list_wins_for_user(&self, user_id: i64) -> Result<Vec<PrizeWon>, StoreError>;
}
