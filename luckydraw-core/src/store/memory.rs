use super::{CancelOutcome, CommitOutcome, EventStore, StoreError};
use crate::entities::{DrawEvent, Participant, PrizeWon, WinnerAssignment};
use async_trait::async_trait;
use luckydraw_sdk::objects::EventFilter;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// [`EventStore`] kept in process memory.
///
/// Every operation takes the single write (or read) lock for its whole
/// duration, which gives the same atomicity as the PostgreSQL transactions.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<Uuid, DrawEvent>,
    participants: HashMap<Uuid, Vec<Participant>>,
    winners: HashMap<Uuid, Vec<WinnerAssignment>>,
}

impl Tables {
    fn sorted_events<'a>(&self, events: impl Iterator<Item = &'a DrawEvent>) -> Vec<DrawEvent> {
        let mut events: Vec<DrawEvent> = events.cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        events
    }
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn get_event(&self, event_id: Uuid) -> Result<Option<DrawEvent>, StoreError> {
        Ok(self.inner.read().await.events.get(&event_id).cloned())
    }

    async fn put_event(&self, event: &DrawEvent) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        if let Some(existing) = tables.events.get_mut(&event.id) {
            if existing.resolved {
                return Err(StoreError::EventResolved { event_id: event.id });
            }
            let created_at = existing.created_at;
            *existing = DrawEvent {
                created_at,
                ..event.clone()
            };
        } else {
            tables.events.insert(event.id, event.clone());
        }
        Ok(())
    }

    async fn list_events(&self, filter: EventFilter) -> Result<Vec<DrawEvent>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.sorted_events(tables.events.values().filter(|e| e.matches(filter))))
    }

    async fn add_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        if !tables.events.contains_key(&participant.event_id) {
            return Err(StoreError::EventNotFound(participant.event_id));
        }
        let joined = tables.participants.entry(participant.event_id).or_default();
        if joined.iter().any(|p| p.user_id == participant.user_id) {
            return Err(StoreError::DuplicateParticipant {
                event_id: participant.event_id,
                user_id: participant.user_id,
            });
        }
        joined.push(participant.clone());
        Ok(())
    }

    async fn count_participants(&self, event_id: Uuid) -> Result<u64, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.participants.get(&event_id).map_or(0, |p| p.len() as u64))
    }

    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.participants.get(&event_id).cloned().unwrap_or_default())
    }

    async fn has_participant(&self, event_id: Uuid, user_id: i64) -> Result<bool, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .participants
            .get(&event_id)
            .is_some_and(|p| p.iter().any(|p| p.user_id == user_id)))
    }

    async fn add_winner(&self, winner: &WinnerAssignment) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        match tables.events.get(&winner.event_id) {
            None => return Err(StoreError::EventNotFound(winner.event_id)),
            Some(event) if !event.resolved => {
                return Err(StoreError::EventNotResolved {
                    event_id: winner.event_id,
                });
            }
            Some(_) => {}
        }
        let winners = tables.winners.entry(winner.event_id).or_default();
        if winners.iter().any(|w| w.user_id == winner.user_id) {
            return Err(StoreError::DuplicateWinner {
                event_id: winner.event_id,
                user_id: winner.user_id,
            });
        }
        winners.push(winner.clone());
        Ok(())
    }

    async fn list_winners(&self, event_id: Uuid) -> Result<Vec<WinnerAssignment>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.winners.get(&event_id).cloned().unwrap_or_default())
    }

    async fn commit_resolution(
        &self,
        event_id: Uuid,
        winners: &[WinnerAssignment],
    ) -> Result<CommitOutcome, StoreError> {
        let mut tables = self.inner.write().await;
        let event = tables
            .events
            .get(&event_id)
            .ok_or(StoreError::EventNotFound(event_id))?;
        if event.resolved {
            return Ok(CommitOutcome::AlreadyResolved);
        }
        if event.cancelled {
            return Ok(CommitOutcome::AlreadyCancelled);
        }

        let stored = tables.winners.entry(event_id).or_default();
        for winner in winners {
            if stored.iter().any(|w| w.user_id == winner.user_id) {
                return Err(StoreError::DuplicateWinner {
                    event_id,
                    user_id: winner.user_id,
                });
            }
        }
        stored.extend_from_slice(winners);
        if let Some(event) = tables.events.get_mut(&event_id) {
            event.resolved = true;
        }
        Ok(CommitOutcome::Committed)
    }

    async fn mark_cancelled(&self, event_id: Uuid) -> Result<CancelOutcome, StoreError> {
        let mut tables = self.inner.write().await;
        let event = tables
            .events
            .get_mut(&event_id)
            .ok_or(StoreError::EventNotFound(event_id))?;
        if event.resolved {
            return Ok(CancelOutcome::AlreadyResolved);
        }
        if event.cancelled {
            return Ok(CancelOutcome::AlreadyCancelled);
        }
        event.cancelled = true;
        Ok(CancelOutcome::Cancelled)
    }

    async fn list_events_joined_by(&self, user_id: i64) -> Result<Vec<DrawEvent>, StoreError> {
        let tables = self.inner.read().await;
        let joined = tables.events.values().filter(|e| {
            tables
                .participants
                .get(&e.id)
                .is_some_and(|p| p.iter().any(|p| p.user_id == user_id))
        });
        Ok(tables.sorted_events(joined))
    }

    async fn list_wins_for_user(&self, user_id: i64) -> Result<Vec<PrizeWon>, StoreError> {
        let tables = self.inner.read().await;
        let mut wins: Vec<(&DrawEvent, &WinnerAssignment)> = tables
            .winners
            .iter()
            .filter_map(|(event_id, winners)| Some((tables.events.get(event_id)?, winners)))
            .flat_map(|(event, winners)| {
                winners
                    .iter()
                    .filter(|w| w.user_id == user_id)
                    .map(move |w| (event, w))
            })
            .collect();
        wins.sort_by(|(a, _), (b, _)| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(wins
            .into_iter()
            .map(|(event, w)| PrizeWon {
                event_id: event.id,
                title: event.title.clone(),
                prize: w.prize.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Participation, ResolutionTrigger};
    use time::macros::datetime;

    fn event(id: u128, minute: u8) -> DrawEvent {
        DrawEvent {
            id: Uuid::from_u128(id),
            title: format!("event {id}"),
            prize_pool: vec!["A".to_string(), "B".to_string()],
            prize_count: 2,
            trigger: ResolutionTrigger::ByCount { required: 3 },
            participation: Participation::Direct,
            resolved: false,
            cancelled: false,
            created_at: datetime!(2026-01-01 00:00 UTC) + time::Duration::minutes(minute as i64),
        }
    }

    fn participant(event_id: Uuid, user_id: i64) -> Participant {
        Participant {
            event_id,
            user_id,
            display_name: format!("user {user_id}"),
        }
    }

    fn winner(event_id: Uuid, user_id: i64, prize: &str) -> WinnerAssignment {
        WinnerAssignment {
            event_id,
            user_id,
            display_name: format!("user {user_id}"),
            prize: prize.to_string(),
        }
    }

    #[tokio::test]
    async fn test_participants_are_unique_per_event() {
        let store = MemoryEventStore::new();
        let e = event(1, 0);
        store.put_event(&e).await.unwrap();

        store.add_participant(&participant(e.id, 7)).await.unwrap();
        assert!(matches!(
            store.add_participant(&participant(e.id, 7)).await,
            Err(StoreError::DuplicateParticipant { user_id: 7, .. })
        ));
        assert!(matches!(
            store
                .add_participant(&participant(Uuid::from_u128(99), 7))
                .await,
            Err(StoreError::EventNotFound(_))
        ));
        assert_eq!(store.count_participants(e.id).await.unwrap(), 1);
        assert!(store.has_participant(e.id, 7).await.unwrap());
        assert!(!store.has_participant(e.id, 8).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_in_creation_order() {
        let store = MemoryEventStore::new();
        let late = event(1, 30);
        let early = event(2, 10);
        let mut cancelled = event(3, 20);
        cancelled.cancelled = true;
        for e in [&late, &early, &cancelled] {
            store.put_event(e).await.unwrap();
        }

        let all: Vec<Uuid> = store
            .list_events(EventFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(all, vec![early.id, cancelled.id, late.id]);

        let open = store.list_events(EventFilter::Open).await.unwrap();
        assert_eq!(open.len(), 2);
        let closed = store.list_events(EventFilter::Cancelled).await.unwrap();
        assert_eq!(closed, vec![cancelled]);
    }

    #[tokio::test]
    async fn test_commit_is_conditional() {
        let store = MemoryEventStore::new();
        let e = event(1, 0);
        store.put_event(&e).await.unwrap();
        let winners = vec![winner(e.id, 1, "A"), winner(e.id, 2, "B")];

        assert_eq!(
            store.commit_resolution(e.id, &winners).await.unwrap(),
            CommitOutcome::Committed
        );
        assert_eq!(
            store.commit_resolution(e.id, &winners).await.unwrap(),
            CommitOutcome::AlreadyResolved
        );
        assert_eq!(store.list_winners(e.id).await.unwrap(), winners);
        assert_eq!(
            store.mark_cancelled(e.id).await.unwrap(),
            CancelOutcome::AlreadyResolved
        );
        assert!(matches!(
            store.put_event(&e).await,
            Err(StoreError::EventResolved { .. })
        ));
        assert!(store.get_event(e.id).await.unwrap().unwrap().resolved);
    }

    #[tokio::test]
    async fn test_cancel_blocks_commit() {
        let store = MemoryEventStore::new();
        let e = event(1, 0);
        store.put_event(&e).await.unwrap();

        assert_eq!(
            store.mark_cancelled(e.id).await.unwrap(),
            CancelOutcome::Cancelled
        );
        assert_eq!(
            store.mark_cancelled(e.id).await.unwrap(),
            CancelOutcome::AlreadyCancelled
        );
        assert_eq!(
            store
                .commit_resolution(e.id, &[winner(e.id, 1, "A")])
                .await
                .unwrap(),
            CommitOutcome::AlreadyCancelled
        );
        assert!(store.list_winners(e.id).await.unwrap().is_empty());
        assert!(matches!(
            store.mark_cancelled(Uuid::from_u128(42)).await,
            Err(StoreError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_user_history() {
        let store = MemoryEventStore::new();
        let first = event(1, 0);
        let second = event(2, 5);
        store.put_event(&first).await.unwrap();
        store.put_event(&second).await.unwrap();
        store.add_participant(&participant(first.id, 7)).await.unwrap();
        store.add_participant(&participant(second.id, 7)).await.unwrap();
        store.add_participant(&participant(second.id, 8)).await.unwrap();
        assert!(matches!(
            store.add_winner(&winner(second.id, 7, "B")).await,
            Err(StoreError::EventNotResolved { .. })
        ));
        store
            .commit_resolution(second.id, &[winner(second.id, 7, "B")])
            .await
            .unwrap();
        assert!(matches!(
            store.add_winner(&winner(second.id, 7, "A")).await,
            Err(StoreError::DuplicateWinner { .. })
        ));

        let joined = store.list_events_joined_by(7).await.unwrap();
        assert_eq!(
            joined.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert_eq!(
            store.list_wins_for_user(7).await.unwrap(),
            vec![PrizeWon {
                event_id: second.id,
                title: second.title.clone(),
                prize: "B".to_string(),
            }]
        );
        assert!(store.list_wins_for_user(8).await.unwrap().is_empty());
    }
}
