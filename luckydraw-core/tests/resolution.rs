mod common;

use async_trait::async_trait;
use common::{by_count_event, Harness};
use luckydraw_core::entities::{DrawEvent, Participant, PrizeWon, WinnerAssignment};
use luckydraw_core::events::{notification_channel, DrawNotification};
use luckydraw_core::processors::{DrawError, JoinError, ResolutionEngine};
use luckydraw_core::store::{
    CancelOutcome, CommitOutcome, EventStore, MemoryEventStore, StoreError,
};
use luckydraw_sdk::objects::{ChatContext, EventFilter};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolves_commit_exactly_once() {
    let harness = Harness::new();
    let event = by_count_event(&["A", "B", "C"], 3, 100);
    harness.store.put_event(&event).await.unwrap();
    harness.add_participants(event.id, 1..=20).await;

    let mut calls = JoinSet::new();
    for _ in 0..16 {
        let engine = harness.engine.clone();
        calls.spawn(async move { engine.resolve(event.id).await });
    }
    let mut resolutions = Vec::new();
    while let Some(result) = calls.join_next().await {
        resolutions.push(result.unwrap().unwrap());
    }

    assert_eq!(resolutions.iter().filter(|r| r.newly_resolved).count(), 1);
    let stored = harness.store.list_winners(event.id).await.unwrap();
    assert_eq!(stored.len(), 3);
    for resolution in &resolutions {
        assert_eq!(resolution.winners, stored);
    }
}

#[tokio::test]
async fn winners_are_distinct_participants() {
    let harness = Harness::new();
    let event = by_count_event(&["A", "B", "C", "D"], 4, 100);
    harness.store.put_event(&event).await.unwrap();
    harness.add_participants(event.id, 10..20).await;

    let resolution = harness.engine.resolve(event.id).await.unwrap();
    let ids: HashSet<i64> = resolution.winners.iter().map(|w| w.user_id).collect();
    assert_eq!(ids.len(), 4);
    assert!(ids.iter().all(|id| (10..20).contains(id)));
    assert!(resolution.winners.iter().all(|w| w.event_id == event.id));
}

#[tokio::test]
async fn five_participants_two_of_three_prizes() {
    let harness = Harness::new();
    let event = by_count_event(&["A", "B", "C"], 2, 5);
    harness.store.put_event(&event).await.unwrap();

    for user_id in 1..=4 {
        let outcome = harness
            .gate
            .join(event.id, user_id, "early", None, ChatContext::Direct)
            .await
            .unwrap();
        assert!(outcome.draw.is_none());
    }

    let fifth = harness
        .gate
        .join(event.id, 5, "fifth", None, ChatContext::Direct)
        .await
        .unwrap();
    assert_eq!(fifth.participant_count, 5);
    let resolution = fifth.draw.unwrap().unwrap();
    let prizes: Vec<&str> = resolution.winners.iter().map(|w| w.prize.as_str()).collect();
    assert_eq!(prizes, vec!["A", "B"]);
    assert_ne!(resolution.winners[0].user_id, resolution.winners[1].user_id);
    assert!(resolution.winners.iter().all(|w| (1..=5).contains(&w.user_id)));

    let stored = harness.store.get_event(event.id).await.unwrap().unwrap();
    assert!(stored.resolved);
    assert!(!stored.cancelled);

    assert!(matches!(
        harness
            .gate
            .join(event.id, 6, "sixth", None, ChatContext::Direct)
            .await,
        Err(JoinError::EventNotOpen(_))
    ));
    assert_eq!(harness.store.count_participants(event.id).await.unwrap(), 5);
}

#[tokio::test]
async fn insufficient_participants_cancels() {
    let mut harness = Harness::new();
    let event = by_count_event(&["A", "B", "C"], 3, 100);
    harness.store.put_event(&event).await.unwrap();
    harness.add_participants(event.id, [1, 2]).await;

    let err = harness.engine.resolve(event.id).await.unwrap_err();
    assert!(matches!(
        err,
        DrawError::InsufficientParticipants {
            prize_count: 3,
            participant_count: 2,
            ..
        }
    ));

    let stored = harness.store.get_event(event.id).await.unwrap().unwrap();
    assert!(stored.cancelled);
    assert!(!stored.resolved);
    assert!(harness.store.list_winners(event.id).await.unwrap().is_empty());

    match harness.notifications.try_recv().unwrap() {
        DrawNotification::AutoCancelled {
            event: cancelled,
            participant_count,
        } => {
            assert_eq!(cancelled.id, event.id);
            assert_eq!(participant_count, 2);
        }
        other => panic!("unexpected notification {other:?}"),
    }

    // Terminal: later calls see a cancelled event.
    assert!(matches!(
        harness.engine.resolve(event.id).await,
        Err(DrawError::EventCancelled(_))
    ));
}

#[tokio::test]
async fn no_participants_leaves_event_open() {
    let harness = Harness::new();
    let event = by_count_event(&["A"], 1, 100);
    harness.store.put_event(&event).await.unwrap();

    assert!(matches!(
        harness.engine.resolve(event.id).await,
        Err(DrawError::NoParticipants(_))
    ));
    let stored = harness.store.get_event(event.id).await.unwrap().unwrap();
    assert!(stored.is_open());
}

#[tokio::test]
async fn re_resolve_returns_stored_winners_without_side_effects() {
    let mut harness = Harness::new();
    let event = by_count_event(&["A", "B"], 2, 100);
    harness.store.put_event(&event).await.unwrap();
    harness.add_participants(event.id, 1..=6).await;

    let first = harness.engine.resolve(event.id).await.unwrap();
    while harness.notifications.try_recv().is_ok() {}

    let second = harness.engine.resolve(event.id).await.unwrap();
    assert!(first.newly_resolved);
    assert!(!second.newly_resolved);
    assert_eq!(first.winners, second.winners);
    assert!(harness.notifications.try_recv().is_err());
    assert_eq!(harness.store.list_winners(event.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let harness = Harness::new();
    assert!(matches!(
        harness.engine.resolve(Uuid::now_v7()).await,
        Err(DrawError::EventNotFound(_))
    ));
}

/// Delegates to a memory store but refuses to commit resolutions.
struct BrokenCommitStore(MemoryEventStore);

#[async_trait]
impl EventStore for BrokenCommitStore {
    async fn get_event(&self, event_id: Uuid) -> Result<Option<DrawEvent>, StoreError> {
        self.0.get_event(event_id).await
    }
    async fn put_event(&self, event: &DrawEvent) -> Result<(), StoreError> {
        self.0.put_event(event).await
    }
    async fn list_events(&self, filter: EventFilter) -> Result<Vec<DrawEvent>, StoreError> {
        self.0.list_events(filter).await
    }
    async fn add_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        self.0.add_participant(participant).await
    }
    async fn count_participants(&self, event_id: Uuid) -> Result<u64, StoreError> {
        self.0.count_participants(event_id).await
    }
    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        self.0.list_participants(event_id).await
    }
    async fn has_participant(&self, event_id: Uuid, user_id: i64) -> Result<bool, StoreError> {
        self.0.has_participant(event_id, user_id).await
    }
    async fn add_winner(&self, winner: &WinnerAssignment) -> Result<(), StoreError> {
        self.0.add_winner(winner).await
    }
    async fn list_winners(&self, event_id: Uuid) -> Result<Vec<WinnerAssignment>, StoreError> {
        self.0.list_winners(event_id).await
    }
    async fn commit_resolution(
        &self,
        _event_id: Uuid,
        _winners: &[WinnerAssignment],
    ) -> Result<CommitOutcome, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn mark_cancelled(&self, event_id: Uuid) -> Result<CancelOutcome, StoreError> {
        self.0.mark_cancelled(event_id).await
    }
    async fn list_events_joined_by(&self, user_id: i64) -> Result<Vec<DrawEvent>, StoreError> {
        self.0.list_events_joined_by(user_id).await
    }
    async fn list_wins_for_user(&self, user_id: i64) -> Result<Vec<PrizeWon>, StoreError> {
        self.0.list_wins_for_user(user_id).await
    }
}

#[tokio::test]
async fn storage_failure_propagates_and_changes_nothing() {
    let store = Arc::new(BrokenCommitStore(MemoryEventStore::new()));
    let (tx, mut rx) = notification_channel();
    let engine = ResolutionEngine::new(store.clone(), tx);
    let event = by_count_event(&["A"], 1, 100);
    store.put_event(&event).await.unwrap();
    store
        .add_participant(&Participant {
            event_id: event.id,
            user_id: 1,
            display_name: "one".to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(
        engine.resolve(event.id).await,
        Err(DrawError::Storage(StoreError::Database(_)))
    ));
    assert!(store.get_event(event.id).await.unwrap().unwrap().is_open());
    assert!(rx.try_recv().is_err());
}
