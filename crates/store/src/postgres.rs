//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, EventId, HoldId, ItemId, JobId};
use domain::{Booking, DateRange, GatewayEventKind, PaymentEventRecord};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::repos::{BookingRepository, CalendarStore, NotificationJobStore, PaymentEventStore};
use crate::types::{Hold, JobStatus, NotificationJob};

/// PostgreSQL implementation of all four repositories.
///
/// Bookings are stored as a JSONB document alongside the columns the
/// calendar queries need, so the document stays the single source of
/// truth while range scans stay indexed.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let doc: serde_json::Value = row.try_get("doc")?;
        Ok(serde_json::from_value(doc)?)
    }

    fn row_to_range(row: &PgRow) -> Result<DateRange> {
        let start: NaiveDate = row.try_get("start_date")?;
        let end: NaiveDate = row.try_get("end_date")?;
        DateRange::new(start, end).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn row_to_hold(row: PgRow) -> Result<Hold> {
        let range = Self::row_to_range(&row)?;
        Ok(Hold {
            id: HoldId::from_uuid(row.try_get::<Uuid, _>("id")?),
            item_id: ItemId::new(row.try_get::<String, _>("item_id")?),
            booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
            range,
            expires_at: row.try_get("expires_at")?,
        })
    }

    fn row_to_event(row: PgRow) -> Result<PaymentEventRecord> {
        let kind_str: String = row.try_get("kind")?;
        let kind = GatewayEventKind::parse(&kind_str)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown event kind: {kind_str}")))?;
        Ok(PaymentEventRecord {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            external_id: row.try_get("external_id")?,
            kind,
            booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
            payload: row.try_get("payload")?,
            received_at: row.try_get("received_at")?,
            processed_at: row.try_get("processed_at")?,
        })
    }

    fn row_to_job(row: PgRow) -> Result<NotificationJob> {
        let kind_str: String = row.try_get("kind")?;
        let kind = domain::NotificationKind::parse(&kind_str)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown notification kind: {kind_str}")))?;
        let status_str: String = row.try_get("status")?;
        let status = JobStatus::parse(&status_str)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown job status: {status_str}")))?;
        Ok(NotificationJob {
            id: JobId::from_uuid(row.try_get::<Uuid, _>("id")?),
            kind,
            booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
            recipient: row.try_get("recipient")?,
            template_data: row.try_get("template_data")?,
            attempts: row.try_get::<i32, _>("attempts")? as u32,
            status,
            next_retry_at: row.try_get("next_retry_at")?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl BookingRepository for PostgresStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        let doc = serde_json::to_value(booking)?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, item_id, start_date, end_date, status, version, doc, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id().as_uuid())
        .bind(booking.item_id().as_str())
        .bind(booking.range().start())
        .bind(booking.range().end())
        .bind(booking.status().as_str())
        .bind(booking.version())
        .bind(doc)
        .bind(booking.created_at())
        .bind(booking.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("bookings_pkey")
            {
                return StoreError::Duplicate(booking.id().to_string());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query("SELECT doc FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn update_booking(&self, booking: &Booking, expected_version: i64) -> Result<i64> {
        let new_version = expected_version + 1;
        let mut updated = booking.clone();
        updated.set_version(new_version);
        let doc = serde_json::to_value(&updated)?;

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $1, version = $2, doc = $3, updated_at = $4
            WHERE id = $5 AND version = $6
            "#,
        )
        .bind(updated.status().as_str())
        .bind(new_version)
        .bind(doc)
        .bind(updated.updated_at())
        .bind(updated.id().as_uuid())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM bookings WHERE id = $1")
                .bind(booking.id().as_uuid())
                .fetch_optional(&self.pool)
                .await?;

            return match actual {
                Some(actual) => Err(StoreError::VersionConflict {
                    booking_id: booking.id(),
                    expected: expected_version,
                    actual,
                }),
                None => Err(StoreError::NotFound(booking.id().to_string())),
            };
        }

        Ok(new_version)
    }

    async fn confirmed_ranges(&self, item_id: &ItemId) -> Result<Vec<DateRange>> {
        let rows = sqlx::query(
            r#"
            SELECT start_date, end_date
            FROM bookings
            WHERE item_id = $1 AND status IN ('confirmed', 'completed')
            ORDER BY start_date ASC
            "#,
        )
        .bind(item_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_range).collect()
    }
}

#[async_trait]
impl CalendarStore for PostgresStore {
    async fn insert_hold(&self, hold: &Hold) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Serializes hold insertion per item across service instances.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(hold.item_id.as_str())
            .execute(&mut *tx)
            .await?;

        let conflict: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM holds
                WHERE item_id = $1
                  AND booking_id <> $2
                  AND expires_at > $3
                  AND start_date < $5 AND $4 < end_date
            ) OR EXISTS (
                SELECT 1 FROM bookings
                WHERE item_id = $1
                  AND status IN ('confirmed', 'completed')
                  AND start_date < $5 AND $4 < end_date
            )
            "#,
        )
        .bind(hold.item_id.as_str())
        .bind(hold.booking_id.as_uuid())
        .bind(Utc::now())
        .bind(hold.range.start())
        .bind(hold.range.end())
        .fetch_one(&mut *tx)
        .await?;

        if conflict {
            return Err(StoreError::RangeConflict {
                item_id: hold.item_id.to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO holds (id, booking_id, item_id, start_date, end_date, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT unique_hold_booking DO UPDATE SET
                id = EXCLUDED.id,
                item_id = EXCLUDED.item_id,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(hold.id.as_uuid())
        .bind(hold.booking_id.as_uuid())
        .bind(hold.item_id.as_str())
        .bind(hold.range.start())
        .bind(hold.range.end())
        .bind(hold.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn active_holds(&self, item_id: &ItemId, now: DateTime<Utc>) -> Result<Vec<Hold>> {
        let rows = sqlx::query(
            r#"
            SELECT id, booking_id, item_id, start_date, end_date, expires_at
            FROM holds
            WHERE item_id = $1 AND expires_at > $2
            ORDER BY start_date ASC
            "#,
        )
        .bind(item_id.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_hold).collect()
    }

    async fn hold_for_booking(&self, booking_id: BookingId) -> Result<Option<Hold>> {
        let row = sqlx::query(
            r#"
            SELECT id, booking_id, item_id, start_date, end_date, expires_at
            FROM holds
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_hold).transpose()
    }

    async fn release_hold(&self, booking_id: BookingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM holds WHERE booking_id = $1")
            .bind(booking_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM holds WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PaymentEventStore for PostgresStore {
    async fn insert_event_if_absent(&self, record: &PaymentEventRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_events (external_id, id, kind, booking_id, payload, received_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO NOTHING
            "#,
        )
        .bind(&record.external_id)
        .bind(record.id.as_uuid())
        .bind(record.kind.as_str())
        .bind(record.booking_id.as_uuid())
        .bind(&record.payload)
        .bind(record.received_at)
        .bind(record.processed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_event_processed(&self, external_id: &str, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE payment_events SET processed_at = $1 WHERE external_id = $2")
            .bind(at)
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(external_id.to_string()));
        }
        Ok(())
    }

    async fn get_event(&self, external_id: &str) -> Result<Option<PaymentEventRecord>> {
        let row = sqlx::query(
            r#"
            SELECT external_id, id, kind, booking_id, payload, received_at, processed_at
            FROM payment_events
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }
}

#[async_trait]
impl NotificationJobStore for PostgresStore {
    async fn enqueue_job(&self, job: &NotificationJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_jobs
                (id, kind, booking_id, recipient, template_data, attempts, status, next_retry_at, last_error, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.kind.as_str())
        .bind(job.booking_id.as_uuid())
        .bind(&job.recipient)
        .bind(&job.template_data)
        .bind(job.attempts as i32)
        .bind(job.status.as_str())
        .bind(job.next_retry_at)
        .bind(&job.last_error)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("notification_jobs_pkey")
            {
                return StoreError::Duplicate(job.id.to_string());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn due_jobs(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<NotificationJob>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, booking_id, recipient, template_data, attempts, status, next_retry_at, last_error, created_at
            FROM notification_jobs
            WHERE status = 'pending' AND next_retry_at <= $1
            ORDER BY next_retry_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_job).collect()
    }

    async fn reschedule_job(
        &self,
        id: JobId,
        attempts: u32,
        next_retry_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE notification_jobs
            SET attempts = $1, next_retry_at = $2, last_error = $3
            WHERE id = $4
            "#,
        )
        .bind(attempts as i32)
        .bind(next_retry_at)
        .bind(last_error)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn mark_job_delivered(&self, id: JobId) -> Result<()> {
        let result = sqlx::query("UPDATE notification_jobs SET status = 'delivered' WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn drop_job(&self, id: JobId) -> Result<()> {
        let result = sqlx::query("UPDATE notification_jobs SET status = 'dropped' WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn dead_letter_job(&self, id: JobId, last_error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notification_jobs SET status = 'dead-lettered', last_error = $1 WHERE id = $2",
        )
        .bind(last_error)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn get_job(&self, id: JobId) -> Result<Option<NotificationJob>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, booking_id, recipient, template_data, attempts, status, next_retry_at, last_error, created_at
            FROM notification_jobs
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_job).transpose()
    }
}
