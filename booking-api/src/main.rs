use anyhow::Context;
use booking_api::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config).context("failed to initialize tracing")?;

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        "Configuration loaded"
    );

    let state = AppState::connect(config.clone())
        .await
        .context("failed to build application state")?;
    let executor = state.executor().clone();

    Server::new(config)
        .serve(router(state), executor)
        .await
        .context("server error")
}
