use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use tradesim_core::AppEnvironment;

pub const ALPHA_VANTAGE_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";
pub const FINNHUB_KEY_VAR: &str = "FINNHUB_API_KEY";
pub const MARKETDATA_APP_TOKEN_VAR: &str = "MARKETDATA_APP_TOKEN";

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub environment: AppEnvironment,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Bound on every upstream call: provider probes, rate lookups, database probe.
    pub upstream_timeout: Duration,
    pub fx_cache_ttl: Duration,
    pub primary_check_interval: Duration,
    pub secondary_check_interval: Duration,
    pub alpha_vantage_api_key: Option<String>,
    pub finnhub_api_key: Option<String>,
    pub marketdata_app_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: "./db/app.db".to_string(),
            environment: AppEnvironment::Production,
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            upstream_timeout: Duration::from_millis(10_000),
            fx_cache_ttl: Duration::from_secs(900),
            primary_check_interval: Duration::from_secs(60),
            secondary_check_interval: Duration::from_secs(3600),
            alpha_vantage_api_key: None,
            finnhub_api_key: None,
            marketdata_app_token: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = std::env::var("TS_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid TS_LISTEN_ADDR")?;
        let db_path = std::env::var("TS_DB_PATH").unwrap_or(defaults.db_path);
        let environment = match std::env::var("TS_ENV") {
            Ok(value) => value
                .parse::<AppEnvironment>()
                .map_err(anyhow::Error::msg)
                .context("Invalid TS_ENV")?,
            Err(_) => defaults.environment,
        };
        let cors_allow = std::env::var("TS_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            listen_addr,
            db_path,
            environment,
            cors_allow,
            request_timeout: Duration::from_millis(env_u64("TS_REQUEST_TIMEOUT_MS", 30_000)),
            upstream_timeout: Duration::from_millis(env_u64("TS_UPSTREAM_TIMEOUT_MS", 10_000)),
            fx_cache_ttl: Duration::from_secs(env_u64("TS_FX_CACHE_TTL_SECS", 900)),
            primary_check_interval: Duration::from_secs(env_u64(
                "TS_PRIMARY_CHECK_INTERVAL_SECS",
                60,
            )),
            secondary_check_interval: Duration::from_secs(env_u64(
                "TS_SECONDARY_CHECK_INTERVAL_SECS",
                3600,
            )),
            alpha_vantage_api_key: env_secret(ALPHA_VANTAGE_KEY_VAR),
            finnhub_api_key: env_secret(FINNHUB_KEY_VAR),
            marketdata_app_token: env_secret(MARKETDATA_APP_TOKEN_VAR),
        })
    }

    /// Credential variable names and whether each one is set.
    pub fn credentials(&self) -> [(&'static str, bool); 3] {
        [
            (ALPHA_VANTAGE_KEY_VAR, self.alpha_vantage_api_key.is_some()),
            (FINNHUB_KEY_VAR, self.finnhub_api_key.is_some()),
            (MARKETDATA_APP_TOKEN_VAR, self.marketdata_app_token.is_some()),
        ]
    }
}

/// Unset or unparsable values fall back to `default`.
fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Blank values count as unset.
fn env_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
