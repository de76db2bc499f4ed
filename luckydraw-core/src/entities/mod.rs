pub mod draw_event;
pub mod participant;
pub mod winner;

pub use draw_event::{ActivationError, DrawEvent, EventDraft, Participation, ResolutionTrigger};
pub use participant::Participant;
pub use winner::{PrizeWon, WinnerAssignment};

use luckydraw_sdk::objects::{
    ParticipationMode as SdkParticipationMode, ResolutionMode as SdkResolutionMode,
};

/// Resolution mode for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `luckydraw_sdk::objects::ResolutionMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "resolution_mode")]
pub enum ResolutionMode {
    ByTime,
    ByCount,
}

impl From<ResolutionMode> for SdkResolutionMode {
    fn from(value: ResolutionMode) -> Self {
        match value {
            ResolutionMode::ByTime => SdkResolutionMode::ByTime,
            ResolutionMode::ByCount => SdkResolutionMode::ByCount,
        }
    }
}

impl From<SdkResolutionMode> for ResolutionMode {
    fn from(value: SdkResolutionMode) -> Self {
        match value {
            SdkResolutionMode::ByTime => ResolutionMode::ByTime,
            SdkResolutionMode::ByCount => ResolutionMode::ByCount,
        }
    }
}

/// Participation mode for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `luckydraw_sdk::objects::ParticipationMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "participation_mode")]
pub enum ParticipationMode {
    Keyword,
    Direct,
}

impl From<ParticipationMode> for SdkParticipationMode {
    fn from(value: ParticipationMode) -> Self {
        match value {
            ParticipationMode::Keyword => SdkParticipationMode::Keyword,
            ParticipationMode::Direct => SdkParticipationMode::Direct,
        }
    }
}

impl From<SdkParticipationMode> for ParticipationMode {
    fn from(value: SdkParticipationMode) -> Self {
        match value {
            SdkParticipationMode::Keyword => ParticipationMode::Keyword,
            SdkParticipationMode::Direct => ParticipationMode::Direct,
        }
    }
}
