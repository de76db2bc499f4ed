use sqlx::PgPool;

/// Target of the `kanau` processors that talk to PostgreSQL.
///
/// Each query is a small request struct with an
/// `impl Processor<Query> for DatabaseProcessor` next to the entity it reads
/// or writes.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
