pub mod config;
pub mod handlers;
pub mod models;
pub mod qr;
pub mod routes;
pub mod state;
pub mod stores;
pub mod utils;
