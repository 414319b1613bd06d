use anyhow::{Context, Result};
use keystatic_gateway::config::{AppState, Config};
use keystatic_gateway::{cms, logger, server};
use std::sync::Arc;

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cfg = Config::load().context("failed to load configuration")?;
    logger::init(&cfg.logging).context("failed to initialize logging")?;

    // Size the runtime from the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<()> {
    let addr = cfg
        .get_socket_addr()
        .map_err(anyhow::Error::msg)
        .context("invalid listen address")?;

    let cms = cms::from_config(&cfg.cms).context("failed to set up CMS handler")?;
    let listener = server::create_reusable_listener(addr)
        .with_context(|| format!("failed to bind {addr}"))?;

    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg, cms));
    let shutdown = server::Shutdown::new();
    server::start_signal_handler(Arc::clone(&shutdown))
        .context("failed to register signal handlers")?;

    server::start_server_loop(listener, state, shutdown).await;
    tracing::info!("gateway stopped");
    Ok(())
}
