use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::qr::{RejectReason, VerifyError, VerifyRequest};
use crate::state::AppState;
use crate::stores::ScanLogStore;
use crate::utils::error::AppError;
use crate::utils::response::{error as error_response, success};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "ticketify-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Mint a fresh token and QR image for a ticket. Consumed by the
/// ticket-detail UI, which re-requests as `expires_in` runs down.
pub async fn generate_qr(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    let issued = state.issuer.issue(&ticket_id).await?;
    Ok(success(issued, "QR token issued").into_response())
}

#[derive(Deserialize)]
pub struct ValidateQrRequest {
    pub token: String,
    pub device_info: Option<String>,
}

#[derive(Serialize)]
struct ValidatedPayload {
    outcome: &'static str,
    ticket_id: String,
}

/// Verify a scanned token. Consumed by the gate-scanning UI.
///
/// Rejections map to 400 with a machine-readable reason (429 for rate
/// limiting) — never 200. Store failures map to 503 so the gate retries
/// instead of turning an attendee away.
pub async fn validate_qr(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ValidateQrRequest>,
) -> Response {
    let request = VerifyRequest {
        token: body.token,
        origin: addr.ip().to_string(),
        device_info: body.device_info,
        agent: None,
    };

    match state.validator.verify(request).await {
        Ok(admission) => success(
            ValidatedPayload {
                outcome: "success",
                ticket_id: admission.ticket_id,
            },
            "Ticket validated",
        )
        .into_response(),
        Err(VerifyError::Rejected(reason)) => {
            let status = match reason {
                RejectReason::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_REQUEST,
            };
            error_response(reason.code(), reason.message(), None, status)
        }
        Err(VerifyError::Transient(err)) => AppError::from(err).into_response(),
    }
}

/// Scan history for a ticket, newest first. Admin/audit review surface.
pub async fn ticket_scans(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    let logs = state.scan_logs.recent_for_ticket(&ticket_id, 50).await?;
    Ok(success(logs, "Scan history").into_response())
}
