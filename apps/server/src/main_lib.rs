use std::sync::Arc;

use crate::config::Config;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use tradesim_core::{
    status::DatabaseProbe, AppEnvironment, RequestTracker, SystemStatusAggregator,
};
use tradesim_market_data::{
    AlphaVantageProvider, ExchangeRateCache, FinnhubProvider, MarketDataAppProvider,
    MarketDataProvider, ProviderHealthMonitor, ProviderRateSource, RateSource, YahooProvider,
};
use tradesim_storage_sqlite::{create_pool, init, SqliteDatabaseProbe};

pub struct AppState {
    pub environment: AppEnvironment,
    pub request_tracker: Arc<RequestTracker>,
    pub provider_health: Arc<ProviderHealthMonitor>,
    pub fx_cache: ExchangeRateCache,
    pub status: SystemStatusAggregator,
    /// Provider used for the quote endpoint.
    pub quote_provider: Arc<dyn MarketDataProvider>,
}

impl AppState {
    /// Wires the reliability layer around the given collaborators.
    ///
    /// `primary` is checked on the primary interval and serves quotes;
    /// `secondary` providers are checked on the secondary interval.
    pub fn new(
        config: &Config,
        database: Arc<dyn DatabaseProbe>,
        primary: Arc<dyn MarketDataProvider>,
        secondary: Vec<Arc<dyn MarketDataProvider>>,
        rate_source: Arc<dyn RateSource>,
    ) -> Self {
        let request_tracker = Arc::new(RequestTracker::new());

        let mut provider_health =
            ProviderHealthMonitor::with_probe_timeout(config.upstream_timeout)
                .with_provider_interval(Arc::clone(&primary), config.primary_check_interval);
        for provider in secondary {
            provider_health =
                provider_health.with_provider_interval(provider, config.secondary_check_interval);
        }
        let provider_health = Arc::new(provider_health);

        let mut status = SystemStatusAggregator::new(
            database,
            Arc::clone(&provider_health),
            Arc::clone(&request_tracker),
        )
        .with_probe_timeout(config.upstream_timeout);
        for (name, present) in config.credentials() {
            status = status.with_credential(name, present);
        }

        let fx_cache = ExchangeRateCache::with_settings(
            rate_source,
            config.fx_cache_ttl,
            config.upstream_timeout,
        );

        Self {
            environment: config.environment,
            request_tracker,
            provider_health,
            fx_cache,
            status,
            quote_provider: primary,
        }
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("TS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);
    let pool = create_pool(&db_path)?;
    let database: Arc<dyn DatabaseProbe> = Arc::new(SqliteDatabaseProbe::new(pool));

    let timeout = config.upstream_timeout;
    let yahoo: Arc<dyn MarketDataProvider> = Arc::new(YahooProvider::with_timeout(timeout));
    let secondary: Vec<Arc<dyn MarketDataProvider>> = vec![
        Arc::new(AlphaVantageProvider::with_timeout(
            config.alpha_vantage_api_key.clone(),
            timeout,
        )),
        Arc::new(FinnhubProvider::with_timeout(
            config.finnhub_api_key.clone(),
            timeout,
        )),
        Arc::new(MarketDataAppProvider::with_timeout(
            config.marketdata_app_token.clone(),
            timeout,
        )),
    ];
    for provider in &secondary {
        if !provider.is_configured() {
            tracing::info!(
                "{} has no credential; it will report unhealthy without being called",
                provider.id()
            );
        }
    }

    let rate_source: Arc<dyn RateSource> = Arc::new(ProviderRateSource::new(Arc::clone(&yahoo)));

    tracing::info!("Running in {} mode", config.environment);
    Ok(Arc::new(AppState::new(
        config,
        database,
        yahoo,
        secondary,
        rate_source,
    )))
}
