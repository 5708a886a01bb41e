use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Legacy admission status values (kept for backward compatibility).
pub mod ticket_status {
    pub const VALID: &str = "valid";
    pub const USED: &str = "used";
    pub const CANCELLED: &str = "cancelled";
}

/// Dynamic QR lifecycle status values.
pub mod qr_status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const USED: &str = "USED";
    pub const EXPIRED: &str = "EXPIRED";
}

/// Individual ticket with a dynamic QR code.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    /// Public, opaque ticket identifier (e.g. "TK2025010112AB34CD").
    pub ticket_id: String,
    pub verification_code: String,
    pub event_id: i64,
    pub user_id: Uuid,
    pub attendee_name: String,
    pub attendee_email: String,
    pub seat_number: Option<String>,
    pub status: String,
    pub validated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<Uuid>,
    /// Per-ticket signing secret, populated lazily on first token issuance.
    pub qr_secret: Option<String>,
    pub qr_status: String,
    pub last_qr_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// True once the ticket has been admitted through either the dynamic QR
    /// status or the legacy admission status. Consumption is one-shot: a
    /// consumed ticket can never be validated again.
    pub fn is_consumed(&self) -> bool {
        self.qr_status == qr_status::USED || self.status == ticket_status::USED
    }
}
