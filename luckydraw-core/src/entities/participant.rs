use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// A user registered for an event. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Participant {
    pub event_id: Uuid,
    pub user_id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone)]
/// Record a participant.
///
/// Fails with a unique violation when the user already joined and with a
/// foreign key violation when the event does not exist.
pub struct InsertParticipant {
    pub participant: Participant,
}

impl Processor<InsertParticipant> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertParticipant")]
    async fn process(&self, insert: InsertParticipant) -> Result<(), sqlx::Error> {
        let p = insert.participant;
        sqlx::query(
            r#"
            INSERT INTO draw_participants (event_id, user_id, display_name)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(p.event_id)
        .bind(p.user_id)
        .bind(p.display_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CountParticipants {
    pub event_id: Uuid,
}

impl Processor<CountParticipants> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountParticipants")]
    async fn process(&self, query: CountParticipants) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM draw_participants WHERE event_id = $1")
            .bind(query.event_id)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// All participants of an event in join order.
pub struct ListParticipants {
    pub event_id: Uuid,
}

impl Processor<ListParticipants> for DatabaseProcessor {
    type Output = Vec<Participant>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListParticipants")]
    async fn process(&self, query: ListParticipants) -> Result<Vec<Participant>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(
            r#"
            SELECT event_id, user_id, display_name
            FROM draw_participants
            WHERE event_id = $1
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(query.event_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct HasParticipant {
    pub event_id: Uuid,
    pub user_id: i64,
}

impl Processor<HasParticipant> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:HasParticipant")]
    async fn process(&self, query: HasParticipant) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM draw_participants WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(query.event_id)
        .bind(query.user_id)
        .fetch_one(&self.pool)
        .await
    }
}
