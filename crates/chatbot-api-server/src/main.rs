use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use chatbot_api_server::{
    build_router,
    config::{SettingsHandle, SettingsWatcher, DEFAULT_SETTINGS_PATH},
    services::{
        BackgroundJobs, ContentRetriever, FaqMatcher, MessagePipeline, ProviderGateway, SessionStore,
        StaticContentSource,
    },
    utils::logger::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings_path =
        std::env::var("SETTINGS_PATH").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let settings = SettingsHandle::load(&settings_path)?;
    let current = settings.current();

    init_logger(&current.logging)?;

    info!("🚀 Starting chatbot API server...");
    info!("✅ Configuration loaded from {}", settings_path);

    current.warn_missing_keys();
    info!(
        "Primary provider: {}, fallback {}, embeddings via {}",
        current.ai.primary_provider,
        if current.ai.fallback_enabled { "enabled" } else { "disabled" },
        current.ai.embedding_provider
    );

    // Hot reload of the settings file
    let _watcher = SettingsWatcher::start(settings.clone())?;

    // FAQ corpus
    let faq = Arc::new(FaqMatcher::load(current.faq.corpus_path.as_deref())?);
    info!("✅ FAQ corpus loaded: {} entries", faq.entries().len());

    // Providers and retrieval
    let gateway = Arc::new(ProviderGateway::new(settings.clone()));

    let source = Arc::new(StaticContentSource::bundled().context("Failed to load site content")?);
    let retriever = Arc::new(ContentRetriever::new(source, gateway.clone(), settings.clone()));

    // Warm-up; failures leave the corpus empty and are retried on the next check
    match retriever.ensure_fresh().await {
        Ok(()) => info!("✅ Content corpus ready: {} items", retriever.corpus_len().await),
        Err(e) => warn!("Content warm-up failed: {}", e),
    }

    let sessions = SessionStore::new(settings.clone());

    let pipeline = Arc::new(MessagePipeline::new(
        sessions.clone(),
        faq,
        retriever.clone(),
        gateway,
    ));

    // Background jobs
    let mut jobs = BackgroundJobs::new();

    let sweep_settings = settings.clone();
    jobs.spawn_periodic(
        "session-sweep",
        move || sweep_settings.current().session.sweep_period(),
        move || {
            let sessions = sessions.clone();
            async move {
                let removed = sessions.sweep_expired();
                let stats = sessions.stats();
                info!(
                    removed,
                    active = stats.active_sessions,
                    messages = stats.stored_messages,
                    "🧹 Session sweep finished"
                );
            }
        },
    );

    let refresh_settings = settings.clone();
    jobs.spawn_periodic(
        "corpus-refresh",
        move || refresh_settings.current().retrieval.refresh_check_period(),
        move || {
            let retriever = retriever.clone();
            async move {
                if let Err(e) = retriever.ensure_fresh().await {
                    error!("Content refresh failed: {}", e);
                }
            }
        },
    );
    info!("✅ {} background jobs started", jobs.len());

    let app = build_router(AppState {
        pipeline,
        settings: settings.clone(),
    });

    // Server address
    let addr = SocketAddr::from((
        current.server.host.parse::<std::net::IpAddr>()?,
        current.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down background jobs...");
    jobs.shutdown().await;
    info!("👋 Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
