//! Token issuance: mints a signed token for the current validity window and
//! renders it as a QR image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde::Serialize;
use thiserror::Error;

use crate::config::QrConfig;
use crate::qr::secret::SecretResolver;
use crate::qr::token::{self, TokenPayload};
use crate::qr::window;
use crate::stores::{StoreError, TicketStore};

/// A freshly minted token plus its rendered QR image.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Base64 of an SVG rendering of the token.
    pub image_base64: String,
    /// Seconds until the current window rolls over and the holder should
    /// refresh.
    pub expires_in: i64,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("ticket not found")]
    UnknownTicket,

    #[error("QR rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mints tokens for tickets. Concurrent issuance for the same ticket races
/// harmlessly: secret derivation is deterministic and the store never
/// overwrites an existing secret.
pub struct TokenIssuer<T> {
    tickets: T,
    secrets: SecretResolver,
    config: QrConfig,
}

impl<T: TicketStore> TokenIssuer<T> {
    pub fn new(tickets: T, config: QrConfig) -> Self {
        let secrets = SecretResolver::new(config.signing_secret.clone());
        Self {
            tickets,
            secrets,
            config,
        }
    }

    /// Mint a token for the current wall-clock window.
    pub async fn issue(&self, ticket_id: &str) -> Result<IssuedToken, IssueError> {
        self.issue_at(ticket_id, Utc::now()).await
    }

    /// Mint a token for the window containing `now`.
    pub async fn issue_at(
        &self,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, IssueError> {
        let ticket = self
            .tickets
            .find_by_ticket_id(ticket_id)
            .await?
            .ok_or(IssueError::UnknownTicket)?;

        let secret = self.secrets.resolve(&ticket);
        let window_ts = window::window_start(now.timestamp(), self.config.refresh_interval);
        let payload = TokenPayload {
            ticket_id: ticket.ticket_id.clone(),
            event_id: ticket.event_id,
            ts: window_ts,
        };
        let token = token::encode(&payload, secret.value.as_bytes());

        let derived_secret = secret.is_derived().then_some(secret.value.as_str());
        self.tickets
            .record_issuance(&ticket.ticket_id, derived_secret, now)
            .await?;

        tracing::debug!(ticket_id = %ticket.ticket_id, window_ts, "QR token issued");

        Ok(IssuedToken {
            image_base64: render_qr_svg(&token)?,
            token,
            expires_in: self.config.refresh_interval,
        })
    }
}

fn render_qr_svg(token: &str) -> Result<String, IssueError> {
    let code = QrCode::with_error_correction_level(token.as_bytes(), EcLevel::H)
        .map_err(|e| IssueError::Render(e.to_string()))?;
    let image = code
        .render()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(STANDARD.encode(image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_produces_base64_svg() {
        let image = render_qr_svg("some-token-value").unwrap();
        let svg_bytes = STANDARD.decode(image).unwrap();
        let svg_text = String::from_utf8(svg_bytes).unwrap();
        assert!(svg_text.contains("<svg"));
    }
}
