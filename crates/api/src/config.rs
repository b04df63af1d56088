//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `WEBHOOK_SECRET` — shared secret for gateway webhook signatures
/// - `HOLD_TTL_MINUTES` — how long a hold blocks the calendar (default: 15)
/// - `RATE_LIMIT_MAX` — reservation attempts per window (default: 10)
/// - `RATE_LIMIT_WINDOW_SECS` — rate-limit window length (default: 60)
/// - `NOTIFY_MAX_ATTEMPTS` — delivery attempts before dead-letter (default: 5)
/// - `RETRY_POLL_SECS` — notification retry poll interval (default: 30)
/// - `SWEEP_POLL_SECS` — expired-hold sweep interval (default: 60)
/// - `OPS_EMAIL` — recipient for operational alerts
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub webhook_secret: String,
    pub hold_ttl_minutes: i64,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub notify_max_attempts: u32,
    pub retry_poll_secs: u64,
    pub sweep_poll_secs: u64,
    pub ops_email: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .unwrap_or_else(|_| "whsec_dev".to_string()),
            hold_ttl_minutes: env_parse("HOLD_TTL_MINUTES", 15),
            rate_limit_max: env_parse("RATE_LIMIT_MAX", 10),
            rate_limit_window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", 60),
            notify_max_attempts: env_parse("NOTIFY_MAX_ATTEMPTS", 5),
            retry_poll_secs: env_parse("RETRY_POLL_SECS", 30),
            sweep_poll_secs: env_parse("SWEEP_POLL_SECS", 60),
            ops_email: std::env::var("OPS_EMAIL").unwrap_or_else(|_| "ops@example.com".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            webhook_secret: "whsec_dev".to_string(),
            hold_ttl_minutes: 15,
            rate_limit_max: 10,
            rate_limit_window_secs: 60,
            notify_max_attempts: 5,
            retry_poll_secs: 30,
            sweep_poll_secs: 60,
            ops_email: "ops@example.com".to_string(),
        }
    }
}
