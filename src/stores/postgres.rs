//! Postgres-backed stores.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ticket::{qr_status, ticket_status};
use crate::models::{Ticket, TicketScanLog};
use crate::stores::{NewScanLog, ScanLogStore, StoreError, TicketStore};

const TICKET_COLUMNS: &str = "id, ticket_id, verification_code, event_id, user_id, \
     attendee_name, attendee_email, seat_number, status, validated_at, validated_by, \
     qr_secret, qr_status, last_qr_generated_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TicketStore for PgTicketStore {
    async fn find_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = $1");
        let ticket = sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn record_issuance(
        &self,
        ticket_id: &str,
        derived_secret: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // COALESCE keeps an already-persisted secret, so concurrent issuance
        // settles on one value no matter which call lands first.
        sqlx::query(
            "UPDATE tickets \
             SET last_qr_generated_at = $2, qr_secret = COALESCE(qr_secret, $3), updated_at = NOW() \
             WHERE ticket_id = $1",
        )
        .bind(ticket_id)
        .bind(at)
        .bind(derived_secret)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume(
        &self,
        ticket_id: &str,
        at: DateTime<Utc>,
        agent: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        // Compare-and-set: the WHERE clause makes the not-yet-consumed check
        // and the status write a single indivisible step, so concurrent
        // attempts on the same ticket admit at most one.
        let result = sqlx::query(
            "UPDATE tickets \
             SET qr_status = $2, validated_at = $3, validated_by = $4, updated_at = NOW() \
             WHERE ticket_id = $1 AND qr_status <> $2 AND status <> $5",
        )
        .bind(ticket_id)
        .bind(qr_status::USED)
        .bind(at)
        .bind(agent)
        .bind(ticket_status::USED)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgScanLogStore {
    pool: PgPool,
}

impl PgScanLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ScanLogStore for PgScanLogStore {
    async fn append(&self, entry: NewScanLog<'_>) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO ticket_scan_logs (ticket_id, success, remote_addr, device_info, notes) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.ticket_id)
        .bind(entry.success)
        .bind(entry.remote_addr)
        .bind(entry.device_info)
        .bind(entry.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_for_ticket(
        &self,
        ticket_id: &str,
        limit: i64,
    ) -> Result<Vec<TicketScanLog>, StoreError> {
        let logs = sqlx::query_as::<_, TicketScanLog>(
            "SELECT id, ticket_id, success, remote_addr, device_info, notes, scanned_at \
             FROM ticket_scan_logs WHERE ticket_id = $1 \
             ORDER BY scanned_at DESC, id DESC LIMIT $2",
        )
        .bind(ticket_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }
}
