use anyhow::{Context, Result};
use chaos_bridge_app::{build_router, AppState, Config};
use chaos_bridge_core::{Dispatcher, Preferences};
use chaos_bridge_policy::SafetyGate;
use chaos_bridge_providers::{
    CodeGenerator, ContentScanner, DisabledScanner, OpenAICompatibleGenerator, RemoteModerator,
    UrlScanner,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let config = Config::load().context("Failed to load configuration")?;
    let api_key = config
        .resolve_api_key()
        .context("No generator API key; set CHAOS_BRIDGE_API_KEY or generator.api_key_file")?;

    let gate = SafetyGate::new(&config.safety).context("Invalid safety configuration")?;
    info!(
        "Safety gate loaded: {} phrases, {} code patterns",
        gate.phrase_count(),
        gate.pattern_count()
    );

    let generator: Arc<dyn CodeGenerator> = Arc::new(OpenAICompatibleGenerator::new(
        config.generator.base_url.clone(),
        Some(api_key),
        config.generator.model.clone(),
        config.generator.timeout_secs,
    ));

    let scanner: Arc<dyn ContentScanner> = if config.scanner.enabled {
        let moderator = Arc::new(RemoteModerator::new(
            config.scanner.moderator_url.clone(),
            config.scanner.timeout_secs,
        ));
        Arc::new(UrlScanner::new(
            config.scanner.trusted_domains.clone(),
            config.scanner.placeholder_url.clone(),
            moderator,
            Duration::from_secs(config.scanner.timeout_secs),
        ))
    } else {
        Arc::new(DisabledScanner)
    };

    let dispatcher = Arc::new(Dispatcher::new(
        gate,
        scanner,
        generator,
        Preferences::from(&config.preferences),
        config.dispatcher_config(),
    ));

    let state = AppState::new(dispatcher, config.scanner.placeholder_url.as_str());
    let app = build_router(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "chaos-bridge listening on http://{} (model: {}, images enabled: {})",
        addr, config.generator.model, config.scanner.enabled
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("chaos-bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
