//! Validation state machine: the verification protocol core.
//!
//! A verification attempt walks an ordered series of checks, cheapest and
//! least sensitive first, so malformed input never triggers cryptographic or
//! state-mutating work. Every rejection appends a failure audit record with
//! its specific reason; the commit path is the only success path and is
//! atomic per ticket. Reason codes are decided here and nowhere else; the
//! codec, signature engine, and resolver only report success or failure.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::QrConfig;
use crate::qr::guard::{RateLimiter, ReplayGuard};
use crate::qr::secret::SecretResolver;
use crate::qr::{signature, token};
use crate::stores::{NewScanLog, ScanLogStore, StoreError, TicketStore};

/// Why a verification attempt was rejected. Terminal for the attempt;
/// machine-readable so the gate UI can distinguish, say, a spent ticket from
/// a forged one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    MalformedToken,
    UnknownTicket,
    EventMismatch,
    BadSignature,
    TokenExpired,
    AlreadyUsed,
    DuplicateScan,
    RateLimited,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::MalformedToken => "MALFORMED_TOKEN",
            RejectReason::UnknownTicket => "UNKNOWN_TICKET",
            RejectReason::EventMismatch => "EVENT_MISMATCH",
            RejectReason::BadSignature => "BAD_SIGNATURE",
            RejectReason::TokenExpired => "TOKEN_EXPIRED",
            RejectReason::AlreadyUsed => "ALREADY_USED",
            RejectReason::DuplicateScan => "DUPLICATE_SCAN",
            RejectReason::RateLimited => "RATE_LIMITED",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RejectReason::MalformedToken => "Invalid token format",
            RejectReason::UnknownTicket => "Ticket not found",
            RejectReason::EventMismatch => "Event mismatch",
            RejectReason::BadSignature => "Invalid signature",
            RejectReason::TokenExpired => "Token expired",
            RejectReason::AlreadyUsed => "Ticket already used",
            RejectReason::DuplicateScan => "Duplicate scan detected",
            RejectReason::RateLimited => "Too many attempts",
        }
    }
}

/// Outcome of a failed verification attempt. A [`VerifyError::Rejected`]
/// token is definitively refused; a [`VerifyError::Transient`] attempt hit
/// infrastructure trouble, did not consume anything, and may be retried.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{}", .0.message())]
    Rejected(RejectReason),

    #[error(transparent)]
    Transient(#[from] StoreError),
}

/// A successful admission.
#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub ticket_id: String,
}

/// One verification attempt as received from a gate agent.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub token: String,
    /// Network origin of the scanning device.
    pub origin: String,
    pub device_info: Option<String>,
    /// The gate agent performing the scan, recorded as `validated_by`.
    pub agent: Option<Uuid>,
}

/// The verification protocol, generic over its persistence and guard seams.
pub struct Validator<T, L, G, R> {
    tickets: T,
    scan_log: L,
    replay: G,
    limiter: R,
    secrets: SecretResolver,
    config: QrConfig,
}

impl<T, L, G, R> Validator<T, L, G, R>
where
    T: TicketStore,
    L: ScanLogStore,
    G: ReplayGuard,
    R: RateLimiter,
{
    pub fn new(tickets: T, scan_log: L, replay: G, limiter: R, config: QrConfig) -> Self {
        let secrets = SecretResolver::new(config.signing_secret.clone());
        Self {
            tickets,
            scan_log,
            replay,
            limiter,
            secrets,
            config,
        }
    }

    /// Verify a token against the current wall clock.
    pub async fn verify(&self, request: VerifyRequest) -> Result<Admission, VerifyError> {
        self.verify_at(request, Utc::now()).await
    }

    /// Verify a token as of `now`. Checks run strictly in order; the first
    /// failure is terminal.
    pub async fn verify_at(
        &self,
        request: VerifyRequest,
        now: DateTime<Utc>,
    ) -> Result<Admission, VerifyError> {
        let now_ts = now.timestamp();

        // 1. Throttle, keyed on the raw parsed ticket id before any
        // signature work so forged tokens cannot probe ids unthrottled. If
        // nothing parses, the origin alone takes the hit.
        let peeked = token::peek_ticket_id(&request.token);
        let throttle_key = match peeked.as_deref() {
            Some(id) => format!("{id}:{}", request.origin),
            None => request.origin.clone(),
        };
        let allowed = self
            .limiter
            .check_and_record(
                &throttle_key,
                self.config.rate_limit_ceiling,
                self.config.throttle_interval,
            )
            .await?;
        if !allowed {
            return Err(self
                .reject(peeked.as_deref(), &request, RejectReason::RateLimited)
                .await?);
        }

        // 2. Decode.
        let decoded = match token::decode(&request.token) {
            Ok(decoded) => decoded,
            Err(_) => {
                return Err(self
                    .reject(peeked.as_deref(), &request, RejectReason::MalformedToken)
                    .await?)
            }
        };
        let payload = &decoded.payload;

        // 3. Ticket lookup.
        let Some(ticket) = self.tickets.find_by_ticket_id(&payload.ticket_id).await? else {
            return Err(self
                .reject(Some(&payload.ticket_id), &request, RejectReason::UnknownTicket)
                .await?);
        };

        // 4. Event match: a token minted for one event must not open another
        // event's gate.
        if payload.event_id != ticket.event_id {
            return Err(self
                .reject(Some(&ticket.ticket_id), &request, RejectReason::EventMismatch)
                .await?);
        }

        // 5. Signature, over the exact decoded bytes.
        let secret = self.secrets.resolve(&ticket);
        if !signature::verify(
            decoded.canonical.as_bytes(),
            secret.value.as_bytes(),
            &decoded.signature,
        ) {
            return Err(self
                .reject(Some(&ticket.ticket_id), &request, RejectReason::BadSignature)
                .await?);
        }

        // 6. Freshness: symmetric tolerance, boundary inclusive.
        if (now_ts - payload.ts).abs() > self.config.freshness_horizon() {
            return Err(self
                .reject(Some(&ticket.ticket_id), &request, RejectReason::TokenExpired)
                .await?);
        }

        // 7. One-shot consumption: a spent ticket stays spent across windows.
        if ticket.is_consumed() {
            return Err(self
                .reject(Some(&ticket.ticket_id), &request, RejectReason::AlreadyUsed)
                .await?);
        }

        // 8. Window-consumption marker, atomic check-and-set. The marker
        // lives exactly as long as a token referencing this window can stay
        // fresh.
        let marker_ttl = Duration::from_secs(self.config.freshness_horizon().unsigned_abs());
        if !self
            .replay
            .mark_if_absent(&ticket.ticket_id, payload.ts, marker_ttl)
            .await?
        {
            return Err(self
                .reject(Some(&ticket.ticket_id), &request, RejectReason::DuplicateScan)
                .await?);
        }

        // 9. Commit: compare-and-set on the persisted status decides the
        // race between concurrent attempts for the same ticket.
        let consumed = match self
            .tickets
            .consume(&ticket.ticket_id, now, request.agent)
            .await
        {
            Ok(consumed) => consumed,
            Err(err) => {
                // The commit never landed; roll the marker back so a retry of
                // the same token is not mis-rejected as a duplicate.
                let _ = self.replay.release(&ticket.ticket_id, payload.ts).await;
                return Err(err.into());
            }
        };
        if !consumed {
            return Err(self
                .reject(Some(&ticket.ticket_id), &request, RejectReason::AlreadyUsed)
                .await?);
        }

        self.scan_log
            .append(NewScanLog {
                ticket_id: Some(&ticket.ticket_id),
                success: true,
                remote_addr: Some(&request.origin),
                device_info: request.device_info.as_deref(),
                notes: "Validated",
            })
            .await?;

        tracing::info!(ticket_id = %ticket.ticket_id, origin = %request.origin, "Ticket validated");

        Ok(Admission {
            ticket_id: ticket.ticket_id,
        })
    }

    /// Append the failure audit record for `reason` and hand back the
    /// rejection. A store failure while logging surfaces as transient via
    /// the caller's `?`.
    async fn reject(
        &self,
        ticket_id: Option<&str>,
        request: &VerifyRequest,
        reason: RejectReason,
    ) -> Result<VerifyError, StoreError> {
        tracing::warn!(
            reason = reason.code(),
            ticket_id = ticket_id.unwrap_or("<unknown>"),
            origin = %request.origin,
            "QR validation rejected"
        );
        self.scan_log
            .append(NewScanLog {
                ticket_id,
                success: false,
                remote_addr: Some(&request.origin),
                device_info: request.device_info.as_deref(),
                notes: reason.message(),
            })
            .await?;
        Ok(VerifyError::Rejected(reason))
    }
}
