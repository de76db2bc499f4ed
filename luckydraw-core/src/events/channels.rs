//! Notification channel factory and handles.

use super::types::DrawNotification;
use tokio::sync::mpsc;

/// Default buffer size for the notification channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

pub type DrawNotificationSender = mpsc::Sender<DrawNotification>;
pub type DrawNotificationReceiver = mpsc::Receiver<DrawNotification>;

/// Create the channel between the resolution engine and the notification
/// sender.
pub fn notification_channel() -> (DrawNotificationSender, DrawNotificationReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
