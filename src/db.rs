// src/db.rs
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AvailabilityBlock, LinkToken, NewBlock, NewParticipant, NewPoll, Participant, Poll, PollPatch,
    TimezoneMode,
};
use crate::store::Store;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Postgres-backed store. Reference DDL lives in `schema.sql`; queries are
/// runtime-bound so the crate builds without a reachable database.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POLL_COLUMNS: &str = "id, title, description, duration_minutes, start_date, end_date, \
                            timezone_mode, fairness_mode, created_at, updated_at";

// timezone_mode is a TEXT column; decode it by hand instead of deriving
// FromRow for the whole struct.
fn poll_from_row(row: &PgRow) -> Result<Poll, StoreError> {
    let mode: String = row.try_get("timezone_mode")?;
    let timezone_mode = TimezoneMode::parse(&mode)
        .ok_or_else(|| StoreError(format!("unknown timezone_mode '{mode}' in polls row")))?;
    Ok(Poll {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        duration_minutes: row.try_get("duration_minutes")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        timezone_mode,
        fairness_mode: row.try_get("fairness_mode")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let sql = format!(
            "INSERT INTO polls (title, description, duration_minutes, start_date, end_date, \
             timezone_mode, fairness_mode) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {POLL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&poll.title)
            .bind(&poll.description)
            .bind(poll.duration_minutes)
            .bind(poll.start_date)
            .bind(poll.end_date)
            .bind(poll.timezone_mode.as_str())
            .bind(poll.fairness_mode)
            .fetch_one(&self.pool)
            .await?;
        poll_from_row(&row)
    }

    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, StoreError> {
        let sql = format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(poll_from_row).transpose()
    }

    async fn update_poll(
        &self,
        poll_id: Uuid,
        patch: PollPatch,
    ) -> Result<Option<Poll>, StoreError> {
        let sql = format!(
            "UPDATE polls SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             duration_minutes = COALESCE($4, duration_minutes), \
             start_date = COALESCE($5, start_date), \
             end_date = COALESCE($6, end_date), \
             timezone_mode = COALESCE($7, timezone_mode), \
             fairness_mode = COALESCE($8, fairness_mode), \
             updated_at = now() \
             WHERE id = $1 RETURNING {POLL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(poll_id)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.duration_minutes)
            .bind(patch.start_date)
            .bind(patch.end_date)
            .bind(patch.timezone_mode.map(|m| m.as_str()))
            .bind(patch.fairness_mode)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(poll_from_row).transpose()
    }

    async fn insert_link_token(
        &self,
        poll_id: Uuid,
        token: &str,
    ) -> Result<LinkToken, StoreError> {
        let row = sqlx::query_as::<_, LinkToken>(
            "INSERT INTO poll_link_tokens (poll_id, token, active) VALUES ($1, $2, TRUE) \
             RETURNING id, poll_id, token, active",
        )
        .bind(poll_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_link_token(
        &self,
        poll_id: Uuid,
        token: &str,
    ) -> Result<Option<LinkToken>, StoreError> {
        let row = sqlx::query_as::<_, LinkToken>(
            "SELECT id, poll_id, token, active FROM poll_link_tokens \
             WHERE poll_id = $1 AND token = $2",
        )
        .bind(poll_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_participant(&self, new: NewParticipant) -> Result<Participant, StoreError> {
        let row = sqlx::query_as::<_, Participant>(
            "INSERT INTO participants (poll_id, name, email, tz) VALUES ($1, $2, $3, $4) \
             RETURNING id, poll_id, name, email, tz, quiet_start, quiet_end, invited_at, \
             responded_at",
        )
        .bind(new.poll_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.tz)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_participant(
        &self,
        poll_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<Participant>, StoreError> {
        let row = sqlx::query_as::<_, Participant>(
            "SELECT id, poll_id, name, email, tz, quiet_start, quiet_end, invited_at, \
             responded_at FROM participants WHERE id = $1 AND poll_id = $2",
        )
        .bind(participant_id)
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_participants(&self, poll_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        let rows = sqlx::query_as::<_, Participant>(
            "SELECT id, poll_id, name, email, tz, quiet_start, quiet_end, invited_at, \
             responded_at FROM participants WHERE poll_id = $1 ORDER BY invited_at ASC",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_blocks(&self, rows: Vec<NewBlock>) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for block in &rows {
            sqlx::query(
                "INSERT INTO availabilities (poll_id, participant_id, start_ts, end_ts) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(block.poll_id)
            .bind(block.participant_id)
            .bind(block.start_ts)
            .bind(block.end_ts)
            .execute(&self.pool)
            .await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn clear_blocks(
        &self,
        poll_id: Uuid,
        participant_id: Uuid,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM availabilities WHERE poll_id = $1 AND participant_id = $2",
        )
        .bind(poll_id)
        .bind(participant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_blocks(&self, poll_id: Uuid) -> Result<Vec<AvailabilityBlock>, StoreError> {
        let rows = sqlx::query_as::<_, AvailabilityBlock>(
            "SELECT id, poll_id, participant_id, start_ts, end_ts FROM availabilities \
             WHERE poll_id = $1 ORDER BY start_ts ASC",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_block(&self, block_id: Uuid) -> Result<Option<AvailabilityBlock>, StoreError> {
        let row = sqlx::query_as::<_, AvailabilityBlock>(
            "SELECT id, poll_id, participant_id, start_ts, end_ts FROM availabilities \
             WHERE id = $1",
        )
        .bind(block_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_block(&self, block_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM availabilities WHERE id = $1")
            .bind(block_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
