//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `RESTAURANT_ID`: restaurant served by this instance (default: `"restaurant_1"`)
/// - `SSE_KEEPALIVE_SECS`: seconds between keep-alive comments on open streams (default: `15`)
/// - `FEED_QUEUE_CAPACITY`: payloads buffered per stream connection (default: `32`)
/// - `SHUTDOWN_GRACE_SECS`: time allowed for handlers to finish on shutdown (default: `5`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub restaurant_id: String,
    pub keep_alive: Duration,
    pub feed_queue_capacity: usize,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed::<u16>(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            restaurant_id: lookup("RESTAURANT_ID").unwrap_or(defaults.restaurant_id),
            keep_alive: parsed::<u64>(&lookup, "SSE_KEEPALIVE_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.keep_alive),
            feed_queue_capacity: parsed::<usize>(&lookup, "FEED_QUEUE_CAPACITY")
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.feed_queue_capacity),
            shutdown_grace: parsed::<u64>(&lookup, "SHUTDOWN_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            restaurant_id: "restaurant_1".to_string(),
            keep_alive: Duration::from_secs(15),
            feed_queue_capacity: 32,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}
