mod health;
mod holdings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{
    http::{HeaderValue, StatusCode},
    middleware, Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{config::Config, error::json_error_body, main_lib::AppState};

/// Build the `/api` router.
///
/// Every `/api` request counts against the per-client default quota; health
/// and holdings lookups also have their own tighter quotas. Clients are keyed
/// by peer IP, so the server must be run with connect info.
pub fn app_router(state: Arc<AppState>, config: &Config) -> anyhow::Result<Router> {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let per_client = |per_minute: u32| {
        GovernorConfigBuilder::default()
            .per_millisecond((60_000 / u64::from(per_minute.max(1))).max(1))
            .burst_size(per_minute)
            .finish()
            .map(|quota| GovernorLayer::new(Arc::new(quota)))
            .with_context(|| format!("Invalid rate limit of {} per minute", per_minute))
    };
    let limits = config.rate_limits;

    let api = Router::new()
        .merge(health::router().route_layer(per_client(limits.health_per_minute)?))
        .merge(holdings::router().route_layer(per_client(limits.holdings_per_minute)?))
        .layer(per_client(limits.default_per_minute)?);

    Ok(Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            config.request_timeout,
        ))
        .layer(middleware::map_response(json_error_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Serve the static UI for every path the API does not claim, falling back
/// to `index.html` for client-side routes.
pub fn with_static_fallback(router: Router, static_dir: &str) -> Router {
    let static_dir = PathBuf::from(static_dir);
    let index_file = static_dir.join("index.html");
    let static_service = ServeDir::new(static_dir).fallback(ServeFile::new(index_file));
    router.fallback_service(static_service)
}
