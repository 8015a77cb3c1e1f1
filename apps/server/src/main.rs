use std::net::SocketAddr;

use nport_server::{
    api::{app_router, with_static_fallback},
    build_state,
    config::Config,
    init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config)?;

    let router = with_static_fallback(app_router(state, &config)?, &config.static_dir);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
