use std::sync::Arc;

use sqlx::PgPool;

use crate::config::QrConfig;
use crate::qr::{MemoryRateLimiter, MemoryReplayGuard, TokenIssuer, Validator};
use crate::stores::{PgScanLogStore, PgTicketStore};

/// Concrete validator wiring for the server: Postgres for authoritative
/// state and the audit log, process-local guards for replay and throttling.
pub type AppValidator =
    Validator<PgTicketStore, PgScanLogStore, MemoryReplayGuard, MemoryRateLimiter>;

pub type AppIssuer = TokenIssuer<PgTicketStore>;

#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<AppIssuer>,
    pub validator: Arc<AppValidator>,
    pub scan_logs: PgScanLogStore,
}

impl AppState {
    pub fn new(pool: PgPool, qr: QrConfig) -> Self {
        let tickets = PgTicketStore::new(pool.clone());
        let scan_logs = PgScanLogStore::new(pool);
        Self {
            issuer: Arc::new(TokenIssuer::new(tickets.clone(), qr.clone())),
            validator: Arc::new(Validator::new(
                tickets,
                scan_logs.clone(),
                MemoryReplayGuard::new(),
                MemoryRateLimiter::new(),
                qr,
            )),
            scan_logs,
        }
    }
}
