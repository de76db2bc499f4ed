use super::{CancelOutcome, CommitOutcome, EventStore, StoreError};
use crate::entities::draw_event::{
    CancelDrawEvent, DrawEventRow, GetDrawEvent, ListDrawEvents, ListEventsJoinedBy,
    UpsertDrawEvent,
};
use crate::entities::participant::{
    CountParticipants, HasParticipant, InsertParticipant, ListParticipants,
};
use crate::entities::winner::{
    CommitResolution, InsertWinner, ListWinners, ListWinsForUser,
};
use crate::entities::{DrawEvent, Participant, PrizeWon, WinnerAssignment};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use luckydraw_sdk::objects::EventFilter;
use sqlx::PgPool;
use uuid::Uuid;

/// [`EventStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    db: DatabaseProcessor,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor::new(pool),
        }
    }
}

fn rows_to_events(rows: Vec<DrawEventRow>) -> Result<Vec<DrawEvent>, StoreError> {
    rows.into_iter().map(DrawEvent::try_from).collect()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn get_event(&self, event_id: Uuid) -> Result<Option<DrawEvent>, StoreError> {
        self.db
            .process(GetDrawEvent { id: event_id })
            .await?
            .map(DrawEvent::try_from)
            .transpose()
    }

    async fn put_event(&self, event: &DrawEvent) -> Result<(), StoreError> {
        let written = self
            .db
            .process(UpsertDrawEvent {
                event: DrawEventRow::from(event),
            })
            .await?;
        if written == 0 {
            return Err(StoreError::EventResolved { event_id: event.id });
        }
        Ok(())
    }

    async fn list_events(&self, filter: EventFilter) -> Result<Vec<DrawEvent>, StoreError> {
        rows_to_events(self.db.process(ListDrawEvents { filter }).await?)
    }

    async fn add_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        match self
            .db
            .process(InsertParticipant {
                participant: participant.clone(),
            })
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateParticipant {
                event_id: participant.event_id,
                user_id: participant.user_id,
            }),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(StoreError::EventNotFound(participant.event_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn count_participants(&self, event_id: Uuid) -> Result<u64, StoreError> {
        let count = self.db.process(CountParticipants { event_id }).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        Ok(self.db.process(ListParticipants { event_id }).await?)
    }

    async fn has_participant(&self, event_id: Uuid, user_id: i64) -> Result<bool, StoreError> {
        Ok(self
            .db
            .process(HasParticipant { event_id, user_id })
            .await?)
    }

    async fn add_winner(&self, winner: &WinnerAssignment) -> Result<(), StoreError> {
        match self
            .db
            .process(InsertWinner {
                winner: winner.clone(),
            })
            .await
        {
            Ok(0) => match self.get_event(winner.event_id).await? {
                Some(_) => Err(StoreError::EventNotResolved {
                    event_id: winner.event_id,
                }),
                None => Err(StoreError::EventNotFound(winner.event_id)),
            },
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateWinner {
                event_id: winner.event_id,
                user_id: winner.user_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_winners(&self, event_id: Uuid) -> Result<Vec<WinnerAssignment>, StoreError> {
        Ok(self.db.process(ListWinners { event_id }).await?)
    }

    async fn commit_resolution(
        &self,
        event_id: Uuid,
        winners: &[WinnerAssignment],
    ) -> Result<CommitOutcome, StoreError> {
        self.db
            .process(CommitResolution {
                event_id,
                winners: winners.to_vec(),
            })
            .await?
            .ok_or(StoreError::EventNotFound(event_id))
    }

    async fn mark_cancelled(&self, event_id: Uuid) -> Result<CancelOutcome, StoreError> {
        self.db
            .process(CancelDrawEvent { id: event_id })
            .await?
            .ok_or(StoreError::EventNotFound(event_id))
    }

    async fn list_events_joined_by(&self, user_id: i64) -> Result<Vec<DrawEvent>, StoreError> {
        rows_to_events(self.db.process(ListEventsJoinedBy { user_id }).await?)
    }

    async fn list_wins_for_user(&self, user_id: i64) -> Result<Vec<PrizeWon>, StoreError> {
        Ok(self.db.process(ListWinsForUser { user_id }).await?)
    }
}
