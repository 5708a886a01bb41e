use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Audit record for one QR scan attempt, success or failure.
///
/// Rows are append-only: the validator writes one per attempt and nothing in
/// this service ever mutates or deletes them. Review order is newest first.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketScanLog {
    pub id: i64,
    /// Public ticket identifier as far as the attempt could establish one.
    /// Malformed tokens may not yield any.
    pub ticket_id: Option<String>,
    pub success: bool,
    pub remote_addr: Option<String>,
    pub device_info: Option<String>,
    pub notes: Option<String>,
    pub scanned_at: DateTime<Utc>,
}
