//! Persistence seams for the QR validation core.
//!
//! The validator and issuer are generic over these traits so tests run
//! against the in-memory implementations while production uses Postgres.
//! Store failures are infrastructure problems, kept strictly apart from
//! verification rejections: the caller retries a [`StoreError`], it never
//! tells an attendee "ticket invalid" because a database hiccuped.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Ticket, TicketScanLog};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryScanLogStore, MemoryTicketStore};
pub use postgres::{PgScanLogStore, PgTicketStore};

/// Infrastructure failure while talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One scan attempt to be appended to the audit log.
#[derive(Debug, Clone, Copy)]
pub struct NewScanLog<'a> {
    pub ticket_id: Option<&'a str>,
    pub success: bool,
    pub remote_addr: Option<&'a str>,
    pub device_info: Option<&'a str>,
    pub notes: &'a str,
}

/// Access to the authoritative ticket records.
pub trait TicketStore: Send + Sync {
    fn find_by_ticket_id(
        &self,
        ticket_id: &str,
    ) -> impl Future<Output = Result<Option<Ticket>, StoreError>> + Send;

    /// Record a token issuance: bump `last_qr_generated_at` and persist a
    /// newly derived secret. An already-present secret is never overwritten,
    /// so concurrent issuance races settle on one consistent value.
    fn record_issuance(
        &self,
        ticket_id: &str,
        derived_secret: Option<&str>,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically transition the ticket to consumed.
    ///
    /// Compare-and-set: the "not yet consumed" check and the status write are
    /// indivisible with respect to concurrent attempts on the same ticket.
    /// Returns `false` when the ticket was already consumed (this attempt
    /// lost the race or arrived late); an unconditional write would be
    /// unsafe here.
    fn consume(
        &self,
        ticket_id: &str,
        at: DateTime<Utc>,
        agent: Option<Uuid>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Append-only audit log of scan attempts.
pub trait ScanLogStore: Send + Sync {
    fn append(
        &self,
        entry: NewScanLog<'_>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Most recent attempts for a ticket, newest first.
    fn recent_for_ticket(
        &self,
        ticket_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<TicketScanLog>, StoreError>> + Send;
}
