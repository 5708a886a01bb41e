//! Per-ticket signing secret resolution.
//!
//! Tickets carry their own signing secret once a token has been issued for
//! them. Tickets that have never had one get a secret derived from the
//! process-wide master secret and the ticket id. Derivation is deterministic,
//! so two concurrent derivations for the same ticket always agree and the
//! race over which one persists first is harmless.

use crate::models::Ticket;
use crate::qr::signature;

/// Where a resolved secret came from. Issuance persists newly derived
/// secrets; the validator never branches on provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    /// The ticket already carried its own secret.
    PerTicket,
    /// Derived from the master secret; not yet persisted on the ticket.
    Derived,
}

#[derive(Debug, Clone)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

impl ResolvedSecret {
    pub fn is_derived(&self) -> bool {
        self.source == SecretSource::Derived
    }
}

/// Resolves the signing secret for a ticket, deriving one lazily if absent.
#[derive(Debug, Clone)]
pub struct SecretResolver {
    master: String,
}

impl SecretResolver {
    pub fn new(master: impl Into<String>) -> Self {
        Self {
            master: master.into(),
        }
    }

    /// The ticket's own secret if present, else a deterministic derivation.
    pub fn resolve(&self, ticket: &Ticket) -> ResolvedSecret {
        match ticket.qr_secret.as_deref() {
            Some(secret) if !secret.is_empty() => ResolvedSecret {
                value: secret.to_string(),
                source: SecretSource::PerTicket,
            },
            _ => ResolvedSecret {
                value: self.derive(&ticket.ticket_id),
                source: SecretSource::Derived,
            },
        }
    }

    /// One-way keyed derivation: `hex(HMAC-SHA256(master, ticket_id))`.
    pub fn derive(&self, ticket_id: &str) -> String {
        signature::sign(ticket_id.as_bytes(), self.master.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn ticket(qr_secret: Option<&str>) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            ticket_id: "TK2025010112AB34CD".to_string(),
            verification_code: "VC-1".to_string(),
            event_id: 42,
            user_id: Uuid::new_v4(),
            attendee_name: "Test Attendee".to_string(),
            attendee_email: "attendee@example.com".to_string(),
            seat_number: None,
            status: "valid".to_string(),
            validated_at: None,
            validated_by: None,
            qr_secret: qr_secret.map(str::to_owned),
            qr_status: "ACTIVE".to_string(),
            last_qr_generated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_per_ticket_secret_wins() {
        let resolver = SecretResolver::new("master");
        let resolved = resolver.resolve(&ticket(Some("per-ticket-secret")));
        assert_eq!(resolved.value, "per-ticket-secret");
        assert_eq!(resolved.source, SecretSource::PerTicket);
    }

    #[test]
    fn test_missing_secret_is_derived() {
        let resolver = SecretResolver::new("master");
        let resolved = resolver.resolve(&ticket(None));
        assert_eq!(resolved.source, SecretSource::Derived);
        assert_eq!(resolved.value, resolver.derive("TK2025010112AB34CD"));
    }

    #[test]
    fn test_empty_secret_treated_as_absent() {
        let resolver = SecretResolver::new("master");
        let resolved = resolver.resolve(&ticket(Some("")));
        assert!(resolved.is_derived());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let resolver = SecretResolver::new("master");
        assert_eq!(resolver.derive("TK1"), resolver.derive("TK1"));
        assert_ne!(resolver.derive("TK1"), resolver.derive("TK2"));
        // A different master secret derives a different per-ticket secret.
        assert_ne!(
            resolver.derive("TK1"),
            SecretResolver::new("other").derive("TK1")
        );
    }
}
