//! TriggerScheduler processor.
//!
//! The TriggerScheduler is responsible for:
//! - Holding one pending timer per open `by_time` event
//! - Calling [`ResolutionEngine::resolve`] once when a deadline passes
//! - Rebuilding its timers from the store on startup, and resolving events
//!   whose deadline passed while the process was down
//! - Periodically re-arming timers and dropping those of events closed out
//!   of band; deadlines that already passed are left to the manual draw
//! - Activating and closing events on behalf of administrators
//!
//! The pending table has its own short-lived lock. It is never held across a
//! resolution; each timer resolves in its own task under the engine's
//! per-event lock.

use crate::entities::{ActivationError, DrawEvent, EventDraft, ResolutionTrigger};
use crate::processors::resolution_engine::{DrawError, ResolutionEngine};
use crate::store::{CancelOutcome, EventStore, StoreError};
use luckydraw_sdk::objects::EventFilter;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Public data types
// ---------------------------------------------------------------------------

/// Result of [`TriggerScheduler::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A new timer was registered.
    Armed,
    /// A timer for this event already exists.
    AlreadyArmed,
    /// The deadline has passed; the caller should resolve now.
    Due,
    /// Resolved, cancelled, or a `by_count` event.
    NotApplicable,
}

/// Which reconciliation pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// After a restart: overdue events are resolved right away.
    Startup,
    /// Periodic pass while running: overdue events already had their timer
    /// fire and are left alone.
    Resync,
}

/// Counters from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Timers newly armed.
    pub armed: usize,
    /// Overdue events resolved (or auto-cancelled) during the pass.
    pub fired: usize,
    /// Overdue events whose resolution failed.
    pub failed: usize,
    /// Timers dropped because their events are no longer open.
    pub discarded: usize,
    /// Overdue events skipped by a resync.
    pub spent: usize,
}

/// An armed deadline, as shown to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTrigger {
    pub event_id: Uuid,
    pub fire_at: OffsetDateTime,
}

struct PendingTrigger {
    fire_at: OffsetDateTime,
    /// Distinguishes this timer from a later one for the same event.
    generation: u64,
    handle: AbortHandle,
}

type PendingTable = Arc<Mutex<HashMap<Uuid, PendingTrigger>>>;

// ---------------------------------------------------------------------------
// TriggerScheduler
// ---------------------------------------------------------------------------

/// Cheap to clone; clones share the same pending table.
#[derive(Clone)]
pub struct TriggerScheduler {
    store: Arc<dyn EventStore>,
    engine: Arc<ResolutionEngine>,
    pending: PendingTable,
    generation: Arc<AtomicU64>,
}

impl TriggerScheduler {
    pub fn new(store: Arc<dyn EventStore>, engine: Arc<ResolutionEngine>) -> Self {
        Self {
            store,
            engine,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run the periodic resync until shutdown is signaled, then abort every
    /// pending timer.
    ///
    /// The first pass runs one `resync_interval` after start; startup
    /// reconciliation is the caller's job.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, resync_interval: Duration) {
        let mut ticker = tokio::time::interval(resync_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(
            armed = self.table().len(),
            resync_secs = resync_interval.as_secs(),
            "TriggerScheduler started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("TriggerScheduler received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match self.reconcile(ReconcileMode::Resync).await {
                        Ok(report) => debug!(?report, "Periodic resync complete"),
                        Err(e) => error!(error = %e, "Periodic resync failed"),
                    }
                }
            }
        }

        let mut table = self.table();
        for (_, pending) in table.drain() {
            pending.handle.abort();
        }
        info!("TriggerScheduler shutdown complete");
    }

    /// Startup reconciliation: arm every open `by_time` event and resolve
    /// the ones whose deadline passed while the process was down.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, StoreError> {
        self.reconcile(ReconcileMode::Startup).await
    }

    /// Bring the timers in line with the store.
    ///
    /// Every open `by_time` event with a future deadline is armed. Overdue
    /// events are resolved in [`ReconcileMode::Startup`] and skipped in
    /// [`ReconcileMode::Resync`], since their timer already fired. Timers of
    /// events that are no longer open are dropped. A failure on one event is
    /// logged and does not stop the pass; only failing to list the events is
    /// an error.
    pub async fn reconcile(&self, mode: ReconcileMode) -> Result<ReconcileReport, StoreError> {
        let open = self.store.list_events(EventFilter::Open).await?;
        let mut report = ReconcileReport::default();

        let open_ids: HashSet<Uuid> = open.iter().map(|e| e.id).collect();
        {
            let mut table = self.table();
            table.retain(|event_id, pending| {
                let keep = open_ids.contains(event_id);
                if !keep {
                    info!(event_id = %event_id, "Discarding timer of closed event");
                    pending.handle.abort();
                    report.discarded += 1;
                }
                keep
            });
        }

        for event in &open {
            match self.arm(event) {
                ArmOutcome::Armed => report.armed += 1,
                ArmOutcome::Due if mode == ReconcileMode::Resync => {
                    debug!(event_id = %event.id, "Deadline already passed, left to manual draw");
                    report.spent += 1;
                }
                ArmOutcome::Due => {
                    info!(event_id = %event.id, "Deadline passed while down, resolving now");
                    match self.engine.resolve(event.id).await {
                        Ok(_) | Err(DrawError::InsufficientParticipants { .. }) => {
                            report.fired += 1
                        }
                        Err(e) => {
                            warn!(event_id = %event.id, error = %e, "Overdue resolution failed");
                            report.failed += 1;
                        }
                    }
                }
                ArmOutcome::AlreadyArmed | ArmOutcome::NotApplicable => {}
            }
        }

        info!(
            armed = report.armed,
            fired = report.fired,
            failed = report.failed,
            discarded = report.discarded,
            spent = report.spent,
            mode = ?mode,
            "Reconciliation complete"
        );
        Ok(report)
    }

    /// Validate and store a new event, arming its timer for `by_time`.
    pub async fn activate(&self, draft: EventDraft) -> Result<DrawEvent, ActivationError> {
        let now = OffsetDateTime::now_utc();
        draft.validate(now)?;
        let event = draft.into_event(Uuid::now_v7(), now);
        self.store.put_event(&event).await?;

        let armed = self.arm(&event);
        info!(
            event_id = %event.id,
            title = %event.title,
            mode = ?event.resolution_mode(),
            arm = ?armed,
            "Event activated"
        );
        Ok(event)
    }

    /// Administrative close: cancel the event and drop its timer.
    pub async fn close(&self, event_id: Uuid) -> Result<CancelOutcome, DrawError> {
        let outcome = self.engine.cancel(event_id).await?;
        self.disarm(event_id);
        Ok(outcome)
    }

    /// Register a timer for `event`. Idempotent.
    pub fn arm(&self, event: &DrawEvent) -> ArmOutcome {
        let ResolutionTrigger::ByTime { draw_at } = event.trigger else {
            return ArmOutcome::NotApplicable;
        };
        if !event.is_open() {
            return ArmOutcome::NotApplicable;
        }

        let mut table = self.table();
        if table.contains_key(&event.id) {
            return ArmOutcome::AlreadyArmed;
        }
        let remaining = draw_at - OffsetDateTime::now_utc();
        let Ok(delay) = Duration::try_from(remaining) else {
            return ArmOutcome::Due;
        };
        if delay.is_zero() {
            return ArmOutcome::Due;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let handle = self.spawn_timer(event.id, generation, delay);
        table.insert(
            event.id,
            PendingTrigger {
                fire_at: draw_at,
                generation,
                handle,
            },
        );
        debug!(event_id = %event.id, fire_at = %draw_at, "Timer armed");
        ArmOutcome::Armed
    }

    /// Drop the timer of an event, if any. Returns whether one existed.
    pub fn disarm(&self, event_id: Uuid) -> bool {
        match self.table().remove(&event_id) {
            Some(pending) => {
                pending.handle.abort();
                debug!(event_id = %event_id, "Timer disarmed");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, event_id: Uuid) -> bool {
        self.table().contains_key(&event_id)
    }

    /// All armed timers, soonest first.
    pub fn armed(&self) -> Vec<ArmedTrigger> {
        let mut armed: Vec<ArmedTrigger> = self
            .table()
            .iter()
            .map(|(event_id, pending)| ArmedTrigger {
                event_id: *event_id,
                fire_at: pending.fire_at,
            })
            .collect();
        armed.sort_by_key(|t| (t.fire_at, t.event_id));
        armed
    }

    // -- Private helpers ----------------------------------------------------

    fn table(&self) -> MutexGuard<'_, HashMap<Uuid, PendingTrigger>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn the task that waits for one deadline.
    ///
    /// On wakeup the task first removes its own entry, so it can no longer be
    /// aborted, and then resolves. The outcome only gets logged: a failed
    /// timer is not re-armed and the event stays available to the manual
    /// draw.
    fn spawn_timer(&self, event_id: Uuid, generation: u64, delay: Duration) -> AbortHandle {
        let pending = Arc::clone(&self.pending);
        let engine = Arc::clone(&self.engine);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut table = pending.lock().unwrap_or_else(|e| e.into_inner());
                match table.get(&event_id) {
                    Some(entry) if entry.generation == generation => {
                        table.remove(&event_id);
                    }
                    _ => return,
                }
            }

            debug!(event_id = %event_id, "Deadline reached");
            match engine.resolve(event_id).await {
                Ok(resolution) => info!(
                    event_id = %event_id,
                    winners = resolution.winners.len(),
                    newly_resolved = resolution.newly_resolved,
                    "Timed draw finished"
                ),
                Err(e) => warn!(event_id = %event_id, error = %e, "Timed draw failed"),
            }
        })
        .abort_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Participation;
    use crate::events::notification_channel;
    use crate::store::MemoryEventStore;

    fn scheduler() -> (TriggerScheduler, Arc<MemoryEventStore>) {
        let store = Arc::new(MemoryEventStore::new());
        let (tx, _rx) = notification_channel();
        let engine = Arc::new(ResolutionEngine::new(store.clone(), tx));
        (TriggerScheduler::new(store.clone(), engine), store)
    }

    fn timed_event(draw_at: OffsetDateTime) -> DrawEvent {
        DrawEvent {
            id: Uuid::now_v7(),
            title: "Timed".to_string(),
            prize_pool: vec!["A".to_string()],
            prize_count: 1,
            trigger: ResolutionTrigger::ByTime { draw_at },
            participation: Participation::Direct,
            resolved: false,
            cancelled: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn test_arm_is_idempotent() {
        let (scheduler, _) = scheduler();
        let event = timed_event(OffsetDateTime::now_utc() + time::Duration::hours(1));

        assert_eq!(scheduler.arm(&event), ArmOutcome::Armed);
        assert_eq!(scheduler.arm(&event), ArmOutcome::AlreadyArmed);
        assert_eq!(scheduler.armed().len(), 1);
        assert_eq!(scheduler.armed()[0].event_id, event.id);

        assert!(scheduler.disarm(event.id));
        assert!(!scheduler.disarm(event.id));
        assert!(!scheduler.is_armed(event.id));
    }

    #[tokio::test]
    async fn test_arm_skips_counts_and_past_deadlines() {
        let (scheduler, _) = scheduler();
        let past = timed_event(OffsetDateTime::now_utc() - time::Duration::minutes(5));
        assert_eq!(scheduler.arm(&past), ArmOutcome::Due);

        let by_count = DrawEvent {
            trigger: ResolutionTrigger::ByCount { required: 3 },
            ..timed_event(OffsetDateTime::now_utc())
        };
        assert_eq!(scheduler.arm(&by_count), ArmOutcome::NotApplicable);

        let closed = DrawEvent {
            cancelled: true,
            ..timed_event(OffsetDateTime::now_utc() + time::Duration::hours(1))
        };
        assert_eq!(scheduler.arm(&closed), ArmOutcome::NotApplicable);
        assert!(scheduler.armed().is_empty());
    }

    #[tokio::test]
    async fn test_resync_discards_closed_events() {
        let (scheduler, store) = scheduler();
        let event = timed_event(OffsetDateTime::now_utc() + time::Duration::hours(1));
        store.put_event(&event).await.unwrap();
        assert_eq!(scheduler.arm(&event), ArmOutcome::Armed);

        store.mark_cancelled(event.id).await.unwrap();
        let report = scheduler.reconcile(ReconcileMode::Resync).await.unwrap();
        assert_eq!(report.discarded, 1);
        assert!(!scheduler.is_armed(event.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_aborts_timers_on_shutdown() {
        let (scheduler, store) = scheduler();
        let event = timed_event(OffsetDateTime::now_utc() + time::Duration::hours(1));
        store.put_event(&event).await.unwrap();
        scheduler.arm(&event);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = tokio::spawn(
            scheduler
                .clone()
                .run(shutdown_rx, Duration::from_secs(300)),
        );
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();

        assert!(scheduler.armed().is_empty());
        assert!(!store.get_event(event.id).await.unwrap().unwrap().resolved);
    }
}
