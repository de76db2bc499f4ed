//! Processors of the draw pipeline.
//!
//! - `ResolutionEngine`: draws winners, the only writer of `resolved`
//! - `TriggerScheduler`: one timer per open `by_time` event, calls the engine
//! - `ParticipationGate`: records joins, calls the engine at the threshold
//! - `NotificationSender`: receives `DrawNotification`, delivers webhooks

pub mod notification_sender;
pub mod participation_gate;
pub mod resolution_engine;
pub mod trigger_scheduler;

pub use notification_sender::{DispatchError, NotificationSender};
pub use participation_gate::{JoinAttempt, JoinError, JoinOutcome, ParticipationGate};
pub use resolution_engine::{DrawError, Resolution, ResolutionEngine};
pub use trigger_scheduler::{
    ArmOutcome, ArmedTrigger, ReconcileMode, ReconcileReport, TriggerScheduler,
};
