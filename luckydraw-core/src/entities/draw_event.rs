use crate::entities::{ParticipationMode, ResolutionMode};
use crate::framework::DatabaseProcessor;
use crate::store::{CancelOutcome, StoreError};
use crate::utils::trigger_time::{self, TriggerTimeError};
use kanau::processor::Processor;
use luckydraw_sdk::objects::{
    ActivateEventRequest, EventFilter, EventStatus, ParticipationSpec, TriggerSpec,
};
use thiserror::Error;
use time::OffsetDateTime;
use time_tz::Tz;
use uuid::Uuid;

/// When an event draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTrigger {
    /// Draw at a fixed instant.
    ByTime { draw_at: OffsetDateTime },
    /// Draw once `required` users have joined.
    ByCount { required: u32 },
}

/// How users join an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participation {
    /// `/join <keyword>` in a group chat.
    Keyword(String),
    /// Bare `/join` in a direct chat with the bot.
    Direct,
}

/// A lucky draw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawEvent {
    pub id: Uuid,
    pub title: String,
    pub prize_pool: Vec<String>,
    pub prize_count: u32,
    pub trigger: ResolutionTrigger,
    pub participation: Participation,
    pub resolved: bool,
    pub cancelled: bool,
    pub created_at: OffsetDateTime,
}

impl DrawEvent {
    /// Neither resolved nor cancelled.
    pub fn is_open(&self) -> bool {
        !self.resolved && !self.cancelled
    }

    pub fn status(&self) -> EventStatus {
        if self.resolved {
            EventStatus::Resolved
        } else if self.cancelled {
            EventStatus::Cancelled
        } else {
            EventStatus::Open
        }
    }

    pub fn resolution_mode(&self) -> ResolutionMode {
        match self.trigger {
            ResolutionTrigger::ByTime { .. } => ResolutionMode::ByTime,
            ResolutionTrigger::ByCount { .. } => ResolutionMode::ByCount,
        }
    }

    pub fn participation_mode(&self) -> ParticipationMode {
        match self.participation {
            Participation::Keyword(_) => ParticipationMode::Keyword,
            Participation::Direct => ParticipationMode::Direct,
        }
    }

    pub fn draw_at(&self) -> Option<OffsetDateTime> {
        match self.trigger {
            ResolutionTrigger::ByTime { draw_at } => Some(draw_at),
            ResolutionTrigger::ByCount { .. } => None,
        }
    }

    pub fn required_participants(&self) -> Option<u32> {
        match self.trigger {
            ResolutionTrigger::ByCount { required } => Some(required),
            ResolutionTrigger::ByTime { .. } => None,
        }
    }

    pub fn keyword(&self) -> Option<&str> {
        match &self.participation {
            Participation::Keyword(keyword) => Some(keyword),
            Participation::Direct => None,
        }
    }

    /// Whether this event matches a listing filter.
    pub fn matches(&self, filter: EventFilter) -> bool {
        match filter {
            EventFilter::All => true,
            EventFilter::Open => self.is_open(),
            EventFilter::Cancelled => self.cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("event title must not be empty")]
    EmptyTitle,
    #[error("prize count must be at least 1")]
    NoPrizes,
    #[error("prize count {prize_count} exceeds the prize pool size {pool_size}")]
    PrizeCountExceedsPool { prize_count: u32, pool_size: usize },
    #[error("participant threshold must be at least 1")]
    ZeroThreshold,
    #[error("prize count {prize_count} exceeds the participant threshold {required}")]
    PrizeCountExceedsThreshold { prize_count: u32, required: u32 },
    #[error("keyword participation needs a non-empty keyword")]
    MissingKeyword,
    #[error("invalid draw time: {0}")]
    Trigger(#[from] TriggerTimeError),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// An event confirmed by an administrator but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub prize_pool: Vec<String>,
    pub prize_count: u32,
    pub trigger: ResolutionTrigger,
    pub participation: Participation,
}

impl EventDraft {
    /// Build a draft from an admin request, reading `draw_at` in `tz`.
    pub fn from_request(request: ActivateEventRequest, tz: &Tz) -> Result<Self, ActivationError> {
        let trigger = match request.trigger {
            TriggerSpec::ByTime { draw_at } => ResolutionTrigger::ByTime {
                draw_at: trigger_time::parse_trigger_time(&draw_at, tz)?,
            },
            TriggerSpec::ByCount { participants } => ResolutionTrigger::ByCount {
                required: participants,
            },
        };
        let participation = match request.participation {
            ParticipationSpec::Keyword { keyword } => {
                Participation::Keyword(keyword.trim().to_string())
            }
            ParticipationSpec::Direct => Participation::Direct,
        };
        Ok(Self {
            title: request.title.trim().to_string(),
            prize_pool: request
                .prize_pool
                .into_iter()
                .map(|prize| prize.trim().to_string())
                .filter(|prize| !prize.is_empty())
                .collect(),
            prize_count: request.prize_count,
            trigger,
            participation,
        })
    }

    pub fn validate(&self, now: OffsetDateTime) -> Result<(), ActivationError> {
        if self.title.is_empty() {
            return Err(ActivationError::EmptyTitle);
        }
        if self.prize_count == 0 {
            return Err(ActivationError::NoPrizes);
        }
        if self.prize_count as usize > self.prize_pool.len() {
            return Err(ActivationError::PrizeCountExceedsPool {
                prize_count: self.prize_count,
                pool_size: self.prize_pool.len(),
            });
        }
        match self.trigger {
            ResolutionTrigger::ByTime { draw_at } => trigger_time::check_lead_time(draw_at, now)?,
            ResolutionTrigger::ByCount { required: 0 } => {
                return Err(ActivationError::ZeroThreshold);
            }
            ResolutionTrigger::ByCount { required } if self.prize_count > required => {
                return Err(ActivationError::PrizeCountExceedsThreshold {
                    prize_count: self.prize_count,
                    required,
                });
            }
            ResolutionTrigger::ByCount { .. } => {}
        }
        if matches!(&self.participation, Participation::Keyword(keyword) if keyword.is_empty()) {
            return Err(ActivationError::MissingKeyword);
        }
        Ok(())
    }

    pub fn into_event(self, id: Uuid, created_at: OffsetDateTime) -> DrawEvent {
        DrawEvent {
            id,
            title: self.title,
            prize_pool: self.prize_pool,
            prize_count: self.prize_count,
            trigger: self.trigger,
            participation: self.participation,
            resolved: false,
            cancelled: false,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

const EVENT_COLUMNS: &str = "id, title, prize_pool, prize_count, resolution_mode, draw_at, \
     required_participants, participation_mode, keyword, resolved, cancelled, created_at";

/// One row of `draw_events`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DrawEventRow {
    pub id: Uuid,
    pub title: String,
    pub prize_pool: Vec<String>,
    pub prize_count: i32,
    pub resolution_mode: ResolutionMode,
    pub draw_at: Option<OffsetDateTime>,
    pub required_participants: Option<i32>,
    pub participation_mode: ParticipationMode,
    pub keyword: Option<String>,
    pub resolved: bool,
    pub cancelled: bool,
    pub created_at: OffsetDateTime,
}

impl TryFrom<DrawEventRow> for DrawEvent {
    type Error = StoreError;

    fn try_from(row: DrawEventRow) -> Result<Self, StoreError> {
        let corrupt = |reason: &str| StoreError::Corrupt {
            event_id: row.id,
            reason: reason.to_string(),
        };
        let trigger = match row.resolution_mode {
            ResolutionMode::ByTime => ResolutionTrigger::ByTime {
                draw_at: row.draw_at.ok_or_else(|| corrupt("by_time event without draw_at"))?,
            },
            ResolutionMode::ByCount => ResolutionTrigger::ByCount {
                required: row
                    .required_participants
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| corrupt("by_count event without a valid threshold"))?,
            },
        };
        let participation = match row.participation_mode {
            ParticipationMode::Keyword => Participation::Keyword(
                row.keyword
                    .clone()
                    .ok_or_else(|| corrupt("keyword event without keyword"))?,
            ),
            ParticipationMode::Direct => Participation::Direct,
        };
        let prize_count =
            u32::try_from(row.prize_count).map_err(|_| corrupt("negative prize count"))?;
        Ok(DrawEvent {
            id: row.id,
            title: row.title,
            prize_pool: row.prize_pool,
            prize_count,
            trigger,
            participation,
            resolved: row.resolved,
            cancelled: row.cancelled,
            created_at: row.created_at,
        })
    }
}

impl From<&DrawEvent> for DrawEventRow {
    fn from(event: &DrawEvent) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            prize_pool: event.prize_pool.clone(),
            prize_count: i32::try_from(event.prize_count).unwrap_or(i32::MAX),
            resolution_mode: event.resolution_mode(),
            draw_at: event.draw_at(),
            required_participants: event
                .required_participants()
                .map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
            participation_mode: event.participation_mode(),
            keyword: event.keyword().map(str::to_string),
            resolved: event.resolved,
            cancelled: event.cancelled,
            created_at: event.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
/// Fetch one event by id.
pub struct GetDrawEvent {
    pub id: Uuid,
}

impl Processor<GetDrawEvent> for DatabaseProcessor {
    type Output = Option<DrawEventRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetDrawEvent")]
    async fn process(&self, query: GetDrawEvent) -> Result<Option<DrawEventRow>, sqlx::Error> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM draw_events WHERE id = $1");
        sqlx::query_as::<_, DrawEventRow>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Insert an event, or overwrite it while it is still unresolved.
///
/// Resolved rows are never touched; the returned count is 0 in that case.
pub struct UpsertDrawEvent {
    pub event: DrawEventRow,
}

impl Processor<UpsertDrawEvent> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertDrawEvent")]
    async fn process(&self, upsert: UpsertDrawEvent) -> Result<u64, sqlx::Error> {
        let row = upsert.event;
        let result = sqlx::query(
            r#"
            INSERT INTO draw_events (
                id, title, prize_pool, prize_count, resolution_mode, draw_at,
                required_participants, participation_mode, keyword, resolved, cancelled, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                prize_pool = EXCLUDED.prize_pool,
                prize_count = EXCLUDED.prize_count,
                resolution_mode = EXCLUDED.resolution_mode,
                draw_at = EXCLUDED.draw_at,
                required_participants = EXCLUDED.required_participants,
                participation_mode = EXCLUDED.participation_mode,
                keyword = EXCLUDED.keyword,
                resolved = EXCLUDED.resolved,
                cancelled = EXCLUDED.cancelled
            WHERE draw_events.resolved = FALSE
            "#,
        )
        .bind(row.id)
        .bind(row.title)
        .bind(row.prize_pool)
        .bind(row.prize_count)
        .bind(row.resolution_mode)
        .bind(row.draw_at)
        .bind(row.required_participants)
        .bind(row.participation_mode)
        .bind(row.keyword)
        .bind(row.resolved)
        .bind(row.cancelled)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// List events in creation order.
pub struct ListDrawEvents {
    pub filter: EventFilter,
}

impl Processor<ListDrawEvents> for DatabaseProcessor {
    type Output = Vec<DrawEventRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListDrawEvents")]
    async fn process(&self, query: ListDrawEvents) -> Result<Vec<DrawEventRow>, sqlx::Error> {
        let condition = match query.filter {
            EventFilter::All => "TRUE",
            EventFilter::Open => "resolved = FALSE AND cancelled = FALSE",
            EventFilter::Cancelled => "cancelled = TRUE",
        };
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM draw_events WHERE {condition} ORDER BY created_at, id"
        );
        sqlx::query_as::<_, DrawEventRow>(&sql)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Events a user has joined, oldest first.
pub struct ListEventsJoinedBy {
    pub user_id: i64,
}

impl Processor<ListEventsJoinedBy> for DatabaseProcessor {
    type Output = Vec<DrawEventRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListEventsJoinedBy")]
    async fn process(&self, query: ListEventsJoinedBy) -> Result<Vec<DrawEventRow>, sqlx::Error> {
        sqlx::query_as::<_, DrawEventRow>(
            r#"
            SELECT
                e.id, e.title, e.prize_pool, e.prize_count, e.resolution_mode, e.draw_at,
                e.required_participants, e.participation_mode, e.keyword, e.resolved,
                e.cancelled, e.created_at
            FROM draw_events e
            JOIN draw_participants p ON p.event_id = e.id
            WHERE p.user_id = $1
            ORDER BY e.created_at, e.id
            "#,
        )
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Set `cancelled` on an open event.
///
/// Runs in a transaction holding the row lock, so it serializes with
/// [`CommitResolution`](crate::entities::winner::CommitResolution).
/// Returns `None` when the event does not exist.
pub struct CancelDrawEvent {
    pub id: Uuid,
}

impl Processor<CancelDrawEvent> for DatabaseProcessor {
    type Output = Option<CancelOutcome>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CancelDrawEvent")]
    async fn process(&self, cancel: CancelDrawEvent) -> Result<Option<CancelOutcome>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let flags: Option<(bool, bool)> = sqlx::query_as(
            "SELECT resolved, cancelled FROM draw_events WHERE id = $1 FOR UPDATE",
        )
        .bind(cancel.id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match flags {
            None => None,
            Some((true, _)) => Some(CancelOutcome::AlreadyResolved),
            Some((false, true)) => Some(CancelOutcome::AlreadyCancelled),
            Some((false, false)) => {
                sqlx::query("UPDATE draw_events SET cancelled = TRUE WHERE id = $1")
                    .bind(cancel.id)
                    .execute(&mut *tx)
                    .await?;
                Some(CancelOutcome::Cancelled)
            }
        };
        tx.commit().await?;
        Ok(outcome)
    }
}
