#![allow(dead_code)]

use luckydraw_core::entities::{DrawEvent, Participant, Participation, ResolutionTrigger};
use luckydraw_core::events::{notification_channel, DrawNotificationReceiver};
use luckydraw_core::processors::{ParticipationGate, ResolutionEngine, TriggerScheduler};
use luckydraw_core::store::{EventStore, MemoryEventStore};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

pub struct Harness {
    pub store: Arc<MemoryEventStore>,
    pub engine: Arc<ResolutionEngine>,
    pub scheduler: TriggerScheduler,
    pub gate: ParticipationGate,
    pub notifications: DrawNotificationReceiver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryEventStore::new()))
    }

    pub fn with_store(store: Arc<MemoryEventStore>) -> Self {
        let (tx, rx) = notification_channel();
        let engine = Arc::new(ResolutionEngine::new(store.clone(), tx));
        let scheduler = TriggerScheduler::new(store.clone(), engine.clone());
        let gate = ParticipationGate::new(store.clone(), engine.clone());
        Self {
            store,
            engine,
            scheduler,
            gate,
            notifications: rx,
        }
    }

    pub async fn add_participants(&self, event_id: Uuid, users: impl IntoIterator<Item = i64>) {
        for user_id in users {
            self.store
                .add_participant(&Participant {
                    event_id,
                    user_id,
                    display_name: format!("user {user_id}"),
                })
                .await
                .unwrap();
        }
    }
}

pub fn pool(prizes: &[&str]) -> Vec<String> {
    prizes.iter().map(|p| p.to_string()).collect()
}

pub fn by_count_event(prizes: &[&str], prize_count: u32, required: u32) -> DrawEvent {
    DrawEvent {
        id: Uuid::now_v7(),
        title: "Count draw".to_string(),
        prize_pool: pool(prizes),
        prize_count,
        trigger: ResolutionTrigger::ByCount { required },
        participation: Participation::Direct,
        resolved: false,
        cancelled: false,
        created_at: OffsetDateTime::now_utc(),
    }
}

pub fn by_time_event(prizes: &[&str], prize_count: u32, draw_at: OffsetDateTime) -> DrawEvent {
    DrawEvent {
        id: Uuid::now_v7(),
        title: "Timed draw".to_string(),
        prize_pool: pool(prizes),
        prize_count,
        trigger: ResolutionTrigger::ByTime { draw_at },
        participation: Participation::Keyword("lucky".to_string()),
        resolved: false,
        cancelled: false,
        created_at: OffsetDateTime::now_utc(),
    }
}
