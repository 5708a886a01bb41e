//! In-memory stores with the same atomicity discipline as the Postgres ones.
//! Used by the test suite; also handy for local development without a
//! database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::ticket::qr_status;
use crate::models::{Ticket, TicketScanLog};
use crate::stores::{NewScanLog, ScanLogStore, StoreError, TicketStore};

fn lock_poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTicketStore {
    tickets: Arc<Mutex<HashMap<String, Ticket>>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ticket: Ticket) {
        if let Ok(mut tickets) = self.tickets.lock() {
            tickets.insert(ticket.ticket_id.clone(), ticket);
        }
    }

    /// Snapshot of a ticket's current state, for assertions.
    pub fn get(&self, ticket_id: &str) -> Option<Ticket> {
        self.tickets.lock().ok()?.get(ticket_id).cloned()
    }
}

impl TicketStore for MemoryTicketStore {
    async fn find_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        let tickets = self.tickets.lock().map_err(|_| lock_poisoned())?;
        Ok(tickets.get(ticket_id).cloned())
    }

    async fn record_issuance(
        &self,
        ticket_id: &str,
        derived_secret: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tickets = self.tickets.lock().map_err(|_| lock_poisoned())?;
        if let Some(ticket) = tickets.get_mut(ticket_id) {
            ticket.last_qr_generated_at = Some(at);
            if ticket.qr_secret.is_none() {
                ticket.qr_secret = derived_secret.map(str::to_owned);
            }
            ticket.updated_at = at;
        }
        Ok(())
    }

    async fn consume(
        &self,
        ticket_id: &str,
        at: DateTime<Utc>,
        agent: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        // Check and write under one lock hold, mirroring the SQL
        // compare-and-set.
        let mut tickets = self.tickets.lock().map_err(|_| lock_poisoned())?;
        match tickets.get_mut(ticket_id) {
            Some(ticket) if !ticket.is_consumed() => {
                ticket.qr_status = qr_status::USED.to_string();
                ticket.validated_at = Some(at);
                ticket.validated_by = agent;
                ticket.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryScanLogStore {
    entries: Arc<Mutex<Vec<TicketScanLog>>>,
}

impl MemoryScanLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in append order, for assertions.
    pub fn entries(&self) -> Vec<TicketScanLog> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ScanLogStore for MemoryScanLogStore {
    async fn append(&self, entry: NewScanLog<'_>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        let id = entries.len() as i64 + 1;
        entries.push(TicketScanLog {
            id,
            ticket_id: entry.ticket_id.map(str::to_owned),
            success: entry.success,
            remote_addr: entry.remote_addr.map(str::to_owned),
            device_info: entry.device_info.map(str::to_owned),
            notes: Some(entry.notes.to_string()),
            scanned_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_for_ticket(
        &self,
        ticket_id: &str,
        limit: i64,
    ) -> Result<Vec<TicketScanLog>, StoreError> {
        let entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        let mut matching: Vec<TicketScanLog> = entries
            .iter()
            .filter(|e| e.ticket_id.as_deref() == Some(ticket_id))
            .cloned()
            .collect();
        matching.reverse();
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(ticket_id: &str) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            ticket_id: ticket_id.to_string(),
            verification_code: format!("VC-{ticket_id}"),
            event_id: 42,
            user_id: Uuid::new_v4(),
            attendee_name: "Test Attendee".to_string(),
            attendee_email: "attendee@example.com".to_string(),
            seat_number: None,
            status: "valid".to_string(),
            validated_at: None,
            validated_by: None,
            qr_secret: None,
            qr_status: "ACTIVE".to_string(),
            last_qr_generated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_consume_is_one_shot() {
        let store = MemoryTicketStore::new();
        store.insert(ticket("TK1"));
        let now = Utc::now();

        assert!(store.consume("TK1", now, None).await.unwrap());
        assert!(!store.consume("TK1", now, None).await.unwrap());
        assert!(!store.consume("missing", now, None).await.unwrap());

        let stored = store.get("TK1").unwrap();
        assert_eq!(stored.qr_status, "USED");
        assert!(stored.validated_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_consume_admits_one() {
        let store = Arc::new(MemoryTicketStore::new());
        store.insert(ticket("TK1"));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.consume("TK1", Utc::now(), None).await.unwrap()
            }));
        }
        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_record_issuance_keeps_existing_secret() {
        let store = MemoryTicketStore::new();
        store.insert(ticket("TK1"));
        let now = Utc::now();

        store
            .record_issuance("TK1", Some("first"), now)
            .await
            .unwrap();
        store
            .record_issuance("TK1", Some("second"), now)
            .await
            .unwrap();

        assert_eq!(store.get("TK1").unwrap().qr_secret.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_recent_for_ticket_newest_first() {
        let store = MemoryScanLogStore::new();
        for (success, notes) in [(false, "Token expired"), (true, "Validated")] {
            store
                .append(NewScanLog {
                    ticket_id: Some("TK1"),
                    success,
                    remote_addr: Some("10.0.0.1"),
                    device_info: None,
                    notes,
                })
                .await
                .unwrap();
        }
        store
            .append(NewScanLog {
                ticket_id: Some("TK2"),
                success: false,
                remote_addr: None,
                device_info: None,
                notes: "Ticket not found",
            })
            .await
            .unwrap();

        let logs = store.recent_for_ticket("TK1", 10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].notes.as_deref(), Some("Validated"));
        assert_eq!(logs[1].notes.as_deref(), Some("Token expired"));
    }
}
