use crate::framework::DatabaseProcessor;
use crate::store::CommitOutcome;
use kanau::processor::Processor;
use uuid::Uuid;

/// One prize handed to one participant of a resolved event.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WinnerAssignment {
    pub event_id: Uuid,
    pub user_id: i64,
    pub display_name: String,
    pub prize: String,
}

/// A prize a user won, for history queries.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PrizeWon {
    pub event_id: Uuid,
    pub title: String,
    pub prize: String,
}

#[derive(Debug, Clone)]
/// Insert a single winner row into a resolved event.
///
/// Returns the number of rows written: 0 when the event is missing or not
/// yet resolved.
pub struct InsertWinner {
    pub winner: WinnerAssignment,
}

impl Processor<InsertWinner> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertWinner")]
    async fn process(&self, insert: InsertWinner) -> Result<u64, sqlx::Error> {
        let w = insert.winner;
        let result = sqlx::query(
            r#"
            INSERT INTO draw_winners (event_id, user_id, display_name, prize)
            SELECT $1, $2, $3, $4
            FROM draw_events
            WHERE id = $1 AND resolved = TRUE
            "#,
        )
        .bind(w.event_id)
        .bind(w.user_id)
        .bind(w.display_name)
        .bind(w.prize)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Winners of an event in prize order.
pub struct ListWinners {
    pub event_id: Uuid,
}

impl Processor<ListWinners> for DatabaseProcessor {
    type Output = Vec<WinnerAssignment>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListWinners")]
    async fn process(&self, query: ListWinners) -> Result<Vec<WinnerAssignment>, sqlx::Error> {
        sqlx::query_as::<_, WinnerAssignment>(
            r#"
            SELECT event_id, user_id, display_name, prize
            FROM draw_winners
            WHERE event_id = $1
            ORDER BY id
            "#,
        )
        .bind(query.event_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListWinsForUser {
    pub user_id: i64,
}

impl Processor<ListWinsForUser> for DatabaseProcessor {
    type Output = Vec<PrizeWon>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListWinsForUser")]
    async fn process(&self, query: ListWinsForUser) -> Result<Vec<PrizeWon>, sqlx::Error> {
        sqlx::query_as::<_, PrizeWon>(
            r#"
            SELECT w.event_id, e.title, w.prize
            FROM draw_winners w
            JOIN draw_events e ON e.id = w.event_id
            WHERE w.user_id = $1
            ORDER BY e.created_at, w.id
            "#,
        )
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Write all winners of an event and set `resolved` in one transaction.
///
/// The event row is locked with `FOR UPDATE` and its flags re-checked first,
/// so a concurrent resolution or cancellation can never interleave.
/// Returns `None` when the event does not exist.
pub struct CommitResolution {
    pub event_id: Uuid,
    pub winners: Vec<WinnerAssignment>,
}

impl Processor<CommitResolution> for DatabaseProcessor {
    type Output = Option<CommitOutcome>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CommitResolution")]
    async fn process(&self, commit: CommitResolution) -> Result<Option<CommitOutcome>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let flags: Option<(bool, bool)> = sqlx::query_as(
            "SELECT resolved, cancelled FROM draw_events WHERE id = $1 FOR UPDATE",
        )
        .bind(commit.event_id)
        .fetch_optional(&mut *tx)
        .await?;

        match flags {
            None => return Ok(None),
            Some((true, _)) => return Ok(Some(CommitOutcome::AlreadyResolved)),
            Some((false, true)) => return Ok(Some(CommitOutcome::AlreadyCancelled)),
            Some((false, false)) => {}
        }

        if !commit.winners.is_empty() {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO draw_winners (event_id, user_id, display_name, prize) ",
            );
            query_builder.push_values(&commit.winners, |mut b, w| {
                b.push_bind(w.event_id)
                    .push_bind(w.user_id)
                    .push_bind(w.display_name.clone())
                    .push_bind(w.prize.clone());
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        sqlx::query("UPDATE draw_events SET resolved = TRUE WHERE id = $1")
            .bind(commit.event_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(CommitOutcome::Committed))
    }
}
