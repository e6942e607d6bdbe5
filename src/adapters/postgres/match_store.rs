//! PostgreSQL implementation of MatchStore.
//!
//! Each transaction runs at SERIALIZABLE isolation, so PostgreSQL itself
//! detects conflicting matching runs. Serialization failures and deadlocks
//! surface as [`StoreError::Conflict`] and the coordinator retries.

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::path::Path;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{
    OrganizationId, ParticipantId, SessionId, Timeslot, Timestamp,
};
use crate::domain::participant::Participant;
use crate::domain::session::{ParticipantPair, Session};
use crate::ports::{MatchStore, MatchTransaction, StoreError};

/// SQLSTATE for `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

const PARTICIPANT_COLUMNS: &str =
    "id, organization_id, preferred_timeslots, is_available, name, position, introduction";
const SESSION_COLUMNS: &str =
    "id, participant_a, participant_b, timeslot, scheduled_for, is_completed, created_at";

/// PostgreSQL-backed match store.
#[derive(Clone)]
pub struct PostgresMatchStore {
    pool: PgPool,
}

impl PostgresMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool sized by `config`, then apply its migrations
    /// if a directory is configured.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::unavailable(format!("Failed to connect: {}", e)))?;

        info!(
            url = %config.redacted_url(),
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );
        let store = Self::new(pool);
        if let Some(dir) = &config.migrations {
            store.migrate(dir).await?;
        }
        Ok(store)
    }

    /// Apply the SQL migrations found in `dir`.
    pub async fn migrate(&self, dir: &Path) -> Result<(), StoreError> {
        let migrator = Migrator::new(dir)
            .await
            .map_err(|e| StoreError::unavailable(format!("Failed to load migrations: {}", e)))?;
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(format!("Failed to run migrations: {}", e)))?;

        info!(dir = %dir.display(), "Migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MatchStore for PostgresMatchStore {
    async fn begin(&self) -> Result<Box<dyn MatchTransaction>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// A SERIALIZABLE transaction. Dropping it without commit rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl MatchTransaction for PostgresTransaction {
    async fn available_participants(&mut self) -> Result<Vec<Participant>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM participants WHERE is_available ORDER BY id",
            PARTICIPANT_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_participant).collect()
    }

    async fn completed_sessions_among(
        &mut self,
        participants: &[ParticipantId],
    ) -> Result<Vec<Session>, StoreError> {
        let ids: Vec<String> = participants.iter().map(|id| id.to_string()).collect();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM sessions
            WHERE is_completed
              AND participant_a = ANY($1)
              AND participant_b = ANY($1)
            ORDER BY created_at, id
            "#,
            SESSION_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.iter().filter_map(row_to_session_lenient).collect())
    }

    async fn participant(&mut self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM participants WHERE id = $1",
            PARTICIPANT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_participant).transpose()
    }

    async fn has_active_session(
        &mut self,
        id: &ParticipantId,
        excluding: Option<&SessionId>,
    ) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE NOT is_completed
                  AND (participant_a = $1 OR participant_b = $1)
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(id.as_str())
        .bind(excluding.map(|s| *s.as_uuid()))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }

    async fn set_availability(
        &mut self,
        id: &ParticipantId,
        available: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE participants SET is_available = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(available)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::corrupt(format!(
                "participant {} does not exist",
                id
            )));
        }
        Ok(())
    }

    async fn create_session(&mut self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, participant_a, participant_b, timeslot, scheduled_for, is_completed, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.participants().first().as_str())
        .bind(session.participants().second().as_str())
        .bind(session.timeslot().as_str())
        .bind(session.scheduled_for().as_datetime())
        .bind(session.is_completed())
        .bind(session.created_at().as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════════════

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());
    if is_retryable_sqlstate(code.as_deref()) {
        StoreError::Conflict
    } else {
        StoreError::unavailable(err.to_string())
    }
}

fn is_retryable_sqlstate(code: Option<&str>) -> bool {
    matches!(code, Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::corrupt(format!("column {}: {}", name, e)))
}

fn row_to_participant(row: &PgRow) -> Result<Participant, StoreError> {
    let id: String = column(row, "id")?;
    let id = ParticipantId::new(id).map_err(|e| StoreError::corrupt(e.to_string()))?;
    let organization: String = column(row, "organization_id")?;
    let organization =
        OrganizationId::new(organization).map_err(|e| StoreError::corrupt(e.to_string()))?;
    let raw_slots: Vec<String> = column(row, "preferred_timeslots")?;
    let name: String = column(row, "name")?;
    let position: String = column(row, "position")?;
    let introduction: String = column(row, "introduction")?;

    Ok(Participant::reconstitute(
        id.clone(),
        organization,
        parse_timeslots(&id, &raw_slots),
        column(row, "is_available")?,
    )
    .with_profile(name, position, introduction))
}

/// Unknown timeslot names are dropped so one bad value cannot block a run.
fn parse_timeslots(id: &ParticipantId, raw: &[String]) -> Vec<Timeslot> {
    let (known, unknown) = Timeslot::parse_known(raw.iter().map(String::as_str));
    for value in unknown {
        warn!(participant_id = %id, timeslot = %value, "Ignoring unknown timeslot");
    }
    known
}

fn row_to_session(row: &PgRow) -> Result<Session, StoreError> {
    let id: uuid::Uuid = column(row, "id")?;
    let a: String = column(row, "participant_a")?;
    let b: String = column(row, "participant_b")?;
    let timeslot: String = column(row, "timeslot")?;
    let scheduled_for: chrono::DateTime<chrono::Utc> = column(row, "scheduled_for")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(row, "created_at")?;

    let corrupt = |e: crate::domain::foundation::ValidationError| StoreError::corrupt(e.to_string());
    let pair = ParticipantPair::new(
        ParticipantId::new(a).map_err(corrupt)?,
        ParticipantId::new(b).map_err(corrupt)?,
    )
    .map_err(corrupt)?;

    Ok(Session::reconstitute(
        SessionId::from_uuid(id),
        pair,
        timeslot.parse().map_err(corrupt)?,
        Timestamp::from_datetime(scheduled_for),
        column(row, "is_completed")?,
        Timestamp::from_datetime(created_at),
    ))
}

/// History rows that do not describe a valid pair are skipped.
fn row_to_session_lenient(row: &PgRow) -> Option<Session> {
    match row_to_session(row) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(error = %e, "Skipping malformed session row");
            None
        }
    }
}
