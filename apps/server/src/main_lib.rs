use std::sync::Arc;

use nport_holdings::{HoldingsService, HoldingsServiceTrait};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub holdings_service: Arc<dyn HoldingsServiceTrait + Send + Sync>,
}

pub fn init_tracing() {
    let log_format = std::env::var("NPORT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
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

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let holdings_service = HoldingsService::from_config(&config.pipeline)?;
    tracing::info!(
        user_agent = %config.pipeline.user_agent,
        rate = config.pipeline.requests_per_second,
        cache_ttl_secs = config.pipeline.cache_ttl.as_secs(),
        "Holdings pipeline ready"
    );
    Ok(Arc::new(AppState {
        holdings_service: Arc::new(holdings_service),
    }))
}
