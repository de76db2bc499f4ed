use crate::entities::{DrawEvent, WinnerAssignment};
use uuid::Uuid;

/// Something the chat gateway should announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawNotification {
    /// Group announcement of a finished draw.
    Resolved {
        event: DrawEvent,
        winners: Vec<WinnerAssignment>,
    },
    /// Private message to one winner.
    WinnerNotice {
        event_id: Uuid,
        title: String,
        winner: WinnerAssignment,
    },
    /// Admin alert: too few participants for the prizes, event cancelled.
    AutoCancelled {
        event: DrawEvent,
        participant_count: u64,
    },
}

impl DrawNotification {
    pub fn event_id(&self) -> Uuid {
        match self {
            DrawNotification::Resolved { event, .. }
            | DrawNotification::AutoCancelled { event, .. } => event.id,
            DrawNotification::WinnerNotice { event_id, .. } => *event_id,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DrawNotification::Resolved { .. } => "resolved",
            DrawNotification::WinnerNotice { .. } => "winner_notice",
            DrawNotification::AutoCancelled { .. } => "auto_cancelled",
        }
    }
}
