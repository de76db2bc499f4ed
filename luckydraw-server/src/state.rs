//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use luckydraw_core::processors::{ParticipationGate, ResolutionEngine, TriggerScheduler};
use luckydraw_core::store::EventStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub engine: Arc<ResolutionEngine>,
    pub scheduler: TriggerScheduler,
    pub gate: Arc<ParticipationGate>,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        engine: Arc<ResolutionEngine>,
        scheduler: TriggerScheduler,
        config: SharedConfig,
    ) -> Self {
        let gate = Arc::new(ParticipationGate::new(store.clone(), engine.clone()));
        Self {
            store,
            engine,
            scheduler,
            gate,
            config,
        }
    }
}
