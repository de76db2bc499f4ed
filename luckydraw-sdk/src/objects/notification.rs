//! Notification payloads delivered to the chat gateway webhook.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::admin::WinnerResponse;
use crate::signature::Signature;

/// Body of a notification webhook.
///
/// The gateway renders `DrawResolved` into the group announcement,
/// `WinnerNotice` into a private message and `DrawCancelled` into an admin
/// alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum NotificationPayload {
    DrawResolved {
        event_id: Uuid,
        title: String,
        winners: Vec<WinnerResponse>,
        timestamp: i64,
    },
    WinnerNotice {
        event_id: Uuid,
        title: String,
        user_id: i64,
        display_name: String,
        prize: String,
        timestamp: i64,
    },
    DrawCancelled {
        event_id: Uuid,
        title: String,
        prize_count: u32,
        participant_count: u64,
        timestamp: i64,
    },
}

impl Signature for NotificationPayload {}

impl NotificationPayload {
    pub fn event_id(&self) -> Uuid {
        match self {
            NotificationPayload::DrawResolved { event_id, .. }
            | NotificationPayload::WinnerNotice { event_id, .. }
            | NotificationPayload::DrawCancelled { event_id, .. } => *event_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_tagged() {
        let payload = NotificationPayload::DrawCancelled {
            event_id: Uuid::nil(),
            title: "t".to_string(),
            prize_count: 3,
            participant_count: 1,
            timestamp: 0,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["event_type"], "draw_cancelled");
        assert_eq!(value["prize_count"], 3);
        assert_eq!(payload.event_id(), Uuid::nil());
    }
}
