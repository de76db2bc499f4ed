//! Notifications emitted by the resolution engine.
//!
//! The engine pushes a [`DrawNotification`] onto a bounded channel after a
//! resolution commits or an event is auto-cancelled. The
//! [`NotificationSender`](crate::processors::NotificationSender) drains the
//! channel and delivers each notification to the chat gateway.
//!
//! Notifications carry the full event and winner data, since they describe
//! a state that is already final.

pub mod channels;
pub mod types;

pub use channels::{
    notification_channel, DrawNotificationReceiver, DrawNotificationSender,
    DEFAULT_CHANNEL_BUFFER,
};
pub use types::DrawNotification;
