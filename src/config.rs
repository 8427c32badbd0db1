//! Typed configuration surface.
//!
//! Consolidates every environment variable recognized by the crate (spec §6)
//! into a single record with defaults, rather than reading `std::env::var`
//! scattered across modules.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_url: Option<String>,
    pub mongodb_db_name: Option<String>,
    pub postgres_url: Option<String>,
    pub similarity_provider_url: Option<String>,
    pub corroboration_window: Duration,
    pub trust_cache_ttl: Duration,
    pub reputation_half_life_days: f64,
    pub max_pipeline_workers: usize,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongodb_url: env::var("MONGODB_URL").ok(),
            mongodb_db_name: env::var("MONGODB_DB_NAME").ok(),
            postgres_url: env::var("POSTGRES_URL").ok(),
            similarity_provider_url: env::var("SIMILARITY_PROVIDER_URL").ok(),
            corroboration_window: Duration::from_secs(
                env::var("CORROBORATION_WINDOW_HOURS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(72)
                    * 3600,
            ),
            trust_cache_ttl: Duration::from_secs(
                env::var("TRUST_CACHE_TTL_SEC")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(3600),
            ),
            reputation_half_life_days: env::var("REPUTATION_HALF_LIFE_DAYS")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(90.0),
            max_pipeline_workers: env::var("MAX_PIPELINE_WORKERS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Initializes `env_logger` from `log_level` (falling back to `RUST_LOG`
    /// if already set). Idempotent — a second call is a no-op rather than a
    /// panic, since the binaries embedding this crate may call it more than
    /// once (e.g. once in `main` and once in an integration test harness).
    pub fn init_logging(&self) {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&self.log_level)).try_init();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongodb_url: None,
            mongodb_db_name: None,
            postgres_url: None,
            similarity_provider_url: None,
            corroboration_window: Duration::from_secs(72 * 3600),
            trust_cache_ttl: Duration::from_secs(3600),
            reputation_half_life_days: 90.0,
            max_pipeline_workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            log_level: "info".to_string(),
        }
    }
}

/// Process exit codes for any CLI entry point built on top of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    ConfigurationError = 2,
    StoreUnreachable = 3,
    InvariantViolation = 4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.corroboration_window, Duration::from_secs(72 * 3600));
        assert_eq!(cfg.trust_cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.reputation_half_life_days, 90.0);
    }

    #[test]
    fn init_logging_is_idempotent() {
        let cfg = Config::default();
        cfg.init_logging();
        cfg.init_logging();
    }
}
