use axum::{
    routing::{get, post},
    Router,
};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{generate_qr, health_check, ticket_scans, validate_qr};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/tickets/:ticket_id/qr", get(generate_qr))
        .route("/api/tickets/:ticket_id/scans", get(ticket_scans))
        .route("/api/qr/validate", post(validate_qr))
        .with_state(state)
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}
