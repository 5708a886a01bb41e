use std::env;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

pub struct Config {
    pub database_url: String,
    pub qr: QrConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/ticketify".to_string()),
            qr: QrConfig::from_env(),
        }
    }
}

/// Tuning for the dynamic QR subsystem. Loaded once at startup and passed
/// into the issuer and validator as an immutable value; nothing in the core
/// reads the environment.
#[derive(Debug, Clone)]
pub struct QrConfig {
    /// Validity window length in seconds. Must be positive.
    pub refresh_interval: i64,
    /// Symmetric tolerance around the window, in seconds, absorbing clock
    /// skew between issuance and verification hosts.
    pub leeway: i64,
    /// Maximum verification attempts per (ticket, origin) within the
    /// throttle interval.
    pub rate_limit_ceiling: u32,
    /// How long rate-limit counters live.
    pub throttle_interval: Duration,
    /// Process-wide master signing secret, used to derive per-ticket secrets.
    pub signing_secret: String,
}

impl QrConfig {
    pub fn from_env() -> Self {
        let config = Self {
            refresh_interval: env_parsed("QR_REFRESH_INTERVAL", 30),
            leeway: env_parsed("QR_LEEWAY_SECONDS", 10),
            rate_limit_ceiling: env_parsed("QR_RATE_LIMIT_CEILING", 10),
            throttle_interval: Duration::from_secs(env_parsed("QR_THROTTLE_INTERVAL", 60)),
            signing_secret: env::var("QR_SIGNING_SECRET")
                .expect("QR_SIGNING_SECRET must be set"),
        };
        assert!(
            config.refresh_interval > 0,
            "QR_REFRESH_INTERVAL must be positive"
        );
        assert!(config.leeway >= 0, "QR_LEEWAY_SECONDS must not be negative");
        config
    }

    /// How far a token's window timestamp may lie from "now" and still be
    /// accepted; also the lifetime of window-consumption markers.
    pub fn freshness_horizon(&self) -> i64 {
        self.refresh_interval + self.leeway
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Config: invalid {} value '{}', using default", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_defaults() {
        std::env::remove_var("QR_REFRESH_INTERVAL");
        std::env::remove_var("QR_LEEWAY_SECONDS");
        std::env::remove_var("QR_RATE_LIMIT_CEILING");
        std::env::remove_var("QR_THROTTLE_INTERVAL");
        std::env::set_var("QR_SIGNING_SECRET", "test-master-secret");

        let config = QrConfig::from_env();
        assert_eq!(config.refresh_interval, 30);
        assert_eq!(config.leeway, 10);
        assert_eq!(config.rate_limit_ceiling, 10);
        assert_eq!(config.throttle_interval, Duration::from_secs(60));
        assert_eq!(config.freshness_horizon(), 40);
    }
}
