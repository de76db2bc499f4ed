//! ResolutionEngine.
//!
//! The single place where an event becomes resolved or auto-cancelled. Both
//! the trigger scheduler (deadline reached) and the participation gate
//! (threshold reached) call [`ResolutionEngine::resolve`]; administrators can
//! call it directly as well.
//!
//! Calls for the same event are serialized by a per-event lock held from the
//! first read of the event until the store commit. The store re-checks the
//! flags inside its own transaction, so exactly one call changes state and
//! every other call observes the result.

use crate::entities::{DrawEvent, Participant, WinnerAssignment};
use crate::events::{DrawNotification, DrawNotificationSender};
use crate::store::{CancelOutcome, CommitOutcome, EventStore, StoreError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    #[error("event {0} is cancelled")]
    EventCancelled(Uuid),

    #[error("event {0} has no participants")]
    NoParticipants(Uuid),

    /// The event has been cancelled as a result.
    #[error(
        "event {event_id} needs {prize_count} participants but only {participant_count} joined"
    )]
    InsufficientParticipants {
        event_id: Uuid,
        prize_count: u32,
        participant_count: u64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// A resolved event and its winners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub event: DrawEvent,
    /// Winners in prize order.
    pub winners: Vec<WinnerAssignment>,
    /// `false` when the event had been resolved before this call.
    pub newly_resolved: bool,
}

/// Registry of per-event locks.
///
/// Entries nobody holds or waits on are pruned on the next acquisition.
#[derive(Debug, Default)]
struct EventLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl EventLocks {
    async fn acquire(&self, event_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(event_id).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct ResolutionEngine {
    store: Arc<dyn EventStore>,
    notifications: DrawNotificationSender,
    locks: EventLocks,
}

impl ResolutionEngine {
    pub fn new(store: Arc<dyn EventStore>, notifications: DrawNotificationSender) -> Self {
        Self {
            store,
            notifications,
            locks: EventLocks::default(),
        }
    }

    /// Take the exclusive section of one event.
    ///
    /// Held by [`resolve`](Self::resolve) and [`cancel`](Self::cancel); the
    /// participation gate holds it while it checks and records a join.
    pub async fn lock_event(&self, event_id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.acquire(event_id).await
    }

    /// Draw the winners of an event.
    ///
    /// Resolving an already resolved event returns the stored winners with
    /// `newly_resolved = false` and has no side effects.
    pub async fn resolve(&self, event_id: Uuid) -> Result<Resolution, DrawError> {
        let guard = self.lock_event(event_id).await;

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(DrawError::EventNotFound(event_id))?;
        if event.resolved {
            debug!(event_id = %event_id, "Event already resolved, returning stored winners");
            return self.stored_resolution(event).await;
        }
        if event.cancelled {
            return Err(DrawError::EventCancelled(event_id));
        }

        let participants = self.store.list_participants(event_id).await?;
        if participants.is_empty() {
            return Err(DrawError::NoParticipants(event_id));
        }

        let participant_count = participants.len() as u64;
        if u64::from(event.prize_count) > participant_count {
            return match self.store.mark_cancelled(event_id).await? {
                CancelOutcome::Cancelled => {
                    drop(guard);
                    warn!(
                        event_id = %event_id,
                        prize_count = event.prize_count,
                        participant_count,
                        "Not enough participants, event cancelled"
                    );
                    let prize_count = event.prize_count;
                    let event = DrawEvent {
                        cancelled: true,
                        ..event
                    };
                    self.notify(DrawNotification::AutoCancelled {
                        event,
                        participant_count,
                    })
                    .await;
                    Err(DrawError::InsufficientParticipants {
                        event_id,
                        prize_count,
                        participant_count,
                    })
                }
                CancelOutcome::AlreadyCancelled => Err(DrawError::EventCancelled(event_id)),
                CancelOutcome::AlreadyResolved => self.stored_resolution(event).await,
            };
        }

        let mut rng = StdRng::seed_from_u64(draw_seed(event_id));
        let winners = select_winners(&event, participants, &mut rng);

        match self.store.commit_resolution(event_id, &winners).await? {
            CommitOutcome::Committed => {}
            CommitOutcome::AlreadyResolved => return self.stored_resolution(event).await,
            CommitOutcome::AlreadyCancelled => return Err(DrawError::EventCancelled(event_id)),
        }
        drop(guard);

        info!(
            event_id = %event_id,
            winners = winners.len(),
            participants = participant_count,
            "Event resolved"
        );

        let event = DrawEvent {
            resolved: true,
            ..event
        };
        self.notify(DrawNotification::Resolved {
            event: event.clone(),
            winners: winners.clone(),
        })
        .await;
        for winner in &winners {
            self.notify(DrawNotification::WinnerNotice {
                event_id,
                title: event.title.clone(),
                winner: winner.clone(),
            })
            .await;
        }

        Ok(Resolution {
            event,
            winners,
            newly_resolved: true,
        })
    }

    /// Administrative close: cancel the event unless it is already final.
    pub async fn cancel(&self, event_id: Uuid) -> Result<CancelOutcome, DrawError> {
        let _guard = self.lock_event(event_id).await;
        let outcome = self.store.mark_cancelled(event_id).await.map_err(|e| match e {
            StoreError::EventNotFound(id) => DrawError::EventNotFound(id),
            e => DrawError::Storage(e),
        })?;
        info!(event_id = %event_id, outcome = ?outcome, "Close requested");
        Ok(outcome)
    }

    async fn stored_resolution(&self, event: DrawEvent) -> Result<Resolution, DrawError> {
        let winners = self.store.list_winners(event.id).await?;
        let event = DrawEvent {
            resolved: true,
            ..event
        };
        Ok(Resolution {
            event,
            winners,
            newly_resolved: false,
        })
    }

    /// Queue a notification, waiting for room in the channel.
    ///
    /// Only called after the event lock is released. A closed channel is
    /// logged and never affects the resolution.
    async fn notify(&self, notification: DrawNotification) {
        let event_id = notification.event_id();
        let kind = notification.kind();
        if self.notifications.send(notification).await.is_err() {
            warn!(event_id = %event_id, kind, "Notification channel closed, notification dropped");
        }
    }
}

/// Seed for one draw: the current time mixed with the event id.
fn draw_seed(event_id: Uuid) -> u64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos() as u64;
    let (high, low) = event_id.as_u64_pair();
    nanos ^ high ^ low.rotate_left(32)
}

/// Shuffle the participants and hand prize `i` to the `i`-th of them.
///
/// The caller guarantees `participants.len() >= event.prize_count`.
pub fn select_winners<R: Rng + ?Sized>(
    event: &DrawEvent,
    mut participants: Vec<Participant>,
    rng: &mut R,
) -> Vec<WinnerAssignment> {
    participants.shuffle(rng);
    participants
        .into_iter()
        .zip(event.prize_pool.iter())
        .take(event.prize_count as usize)
        .map(|(participant, prize)| WinnerAssignment {
            event_id: event.id,
            user_id: participant.user_id,
            display_name: participant.display_name,
            prize: prize.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Participation, ResolutionTrigger};
    use crate::events::notification_channel;
    use crate::store::MemoryEventStore;
    use std::collections::HashSet;

    fn event(prize_count: u32) -> DrawEvent {
        DrawEvent {
            id: Uuid::now_v7(),
            title: "Giveaway".to_string(),
            prize_pool: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            prize_count,
            trigger: ResolutionTrigger::ByCount { required: 10 },
            participation: Participation::Direct,
            resolved: false,
            cancelled: false,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }

    fn participants(event_id: Uuid, n: i64) -> Vec<Participant> {
        (1..=n)
            .map(|user_id| Participant {
                event_id,
                user_id,
                display_name: format!("user {user_id}"),
            })
            .collect()
    }

    #[test]
    fn test_select_winners_pairs_prizes_in_order() {
        let e = event(2);
        let mut rng = StdRng::seed_from_u64(7);
        let winners = select_winners(&e, participants(e.id, 5), &mut rng);

        assert_eq!(winners.len(), 2);
        assert_eq!(winners[0].prize, "A");
        assert_eq!(winners[1].prize, "B");
        assert_ne!(winners[0].user_id, winners[1].user_id);
        assert!(winners.iter().all(|w| (1..=5).contains(&w.user_id)));
    }

    #[test]
    fn test_select_winners_reaches_every_participant() {
        let e = event(1);
        let mut rng = StdRng::seed_from_u64(1);
        let seen: HashSet<i64> = (0..200)
            .map(|_| select_winners(&e, participants(e.id, 4), &mut rng)[0].user_id)
            .collect();
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn test_resolve_notifies_group_and_each_winner() {
        let store = Arc::new(MemoryEventStore::new());
        let (tx, mut rx) = notification_channel();
        let engine = ResolutionEngine::new(store.clone(), tx);
        let e = event(2);
        store.put_event(&e).await.unwrap();
        for p in participants(e.id, 3) {
            store.add_participant(&p).await.unwrap();
        }

        let resolution = engine.resolve(e.id).await.unwrap();
        assert!(resolution.newly_resolved);
        assert!(resolution.event.resolved);

        match rx.recv().await.unwrap() {
            DrawNotification::Resolved { event, winners } => {
                assert_eq!(event.id, e.id);
                assert_eq!(winners, resolution.winners);
            }
            other => panic!("unexpected notification {other:?}"),
        }
        for expected in &resolution.winners {
            match rx.recv().await.unwrap() {
                DrawNotification::WinnerNotice { winner, .. } => assert_eq!(&winner, expected),
                other => panic!("unexpected notification {other:?}"),
            }
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resolve_survives_closed_notification_channel() {
        let store = Arc::new(MemoryEventStore::new());
        let (tx, rx) = notification_channel();
        drop(rx);
        let engine = ResolutionEngine::new(store.clone(), tx);
        let e = event(1);
        store.put_event(&e).await.unwrap();
        store
            .add_participant(&participants(e.id, 1)[0])
            .await
            .unwrap();

        let resolution = engine.resolve(e.id).await.unwrap();
        assert_eq!(resolution.winners.len(), 1);
        assert!(store.get_event(e.id).await.unwrap().unwrap().resolved);
    }

    #[tokio::test]
    async fn test_large_draw_queues_every_winner_notice() {
        let store = Arc::new(MemoryEventStore::new());
        let (tx, mut rx) = notification_channel();
        let engine = ResolutionEngine::new(store.clone(), tx);
        let prizes = 300u32;
        let e = DrawEvent {
            prize_pool: (0..prizes).map(|i| format!("prize {i}")).collect(),
            prize_count: prizes,
            trigger: ResolutionTrigger::ByCount { required: prizes },
            ..event(1)
        };
        store.put_event(&e).await.unwrap();
        for p in participants(e.id, i64::from(prizes)) {
            store.add_participant(&p).await.unwrap();
        }

        let drain = tokio::spawn(async move {
            let mut received = 0usize;
            while rx.recv().await.is_some() {
                received += 1;
            }
            received
        });

        let resolution = engine.resolve(e.id).await.unwrap();
        assert_eq!(resolution.winners.len(), prizes as usize);
        drop(engine);
        assert_eq!(drain.await.unwrap(), prizes as usize + 1);
    }

    #[tokio::test]
    async fn test_cancel_then_resolve() {
        let store = Arc::new(MemoryEventStore::new());
        let (tx, _rx) = notification_channel();
        let engine = ResolutionEngine::new(store.clone(), tx);
        let e = event(1);
        store.put_event(&e).await.unwrap();

        assert_eq!(engine.cancel(e.id).await.unwrap(), CancelOutcome::Cancelled);
        assert_eq!(
            engine.cancel(e.id).await.unwrap(),
            CancelOutcome::AlreadyCancelled
        );
        assert!(matches!(
            engine.resolve(e.id).await,
            Err(DrawError::EventCancelled(_))
        ));
        assert!(matches!(
            engine.cancel(Uuid::now_v7()).await,
            Err(DrawError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_registry_is_pruned() {
        let locks = EventLocks::default();
        for _ in 0..10 {
            let _guard = locks.acquire(Uuid::now_v7()).await;
        }
        let _held = locks.acquire(Uuid::now_v7()).await;
        assert_eq!(locks.len(), 1);
    }
}
