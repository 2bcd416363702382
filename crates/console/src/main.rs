mod app;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use ktanesim_core::{
    config::{self, AppConfig},
    export::{LogArchive, LogExporter, LogStore, OpcLogStore},
    router::{Router, RouterOptions},
    settings::InMemorySettings,
    Dispatcher, ModuleCatalog, SessionRegistry,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let catalog = Arc::new(ModuleCatalog::standard()?);
    let registry = SessionRegistry::new();

    let store: Option<Arc<dyn LogStore>> = match config.log_store.credentials() {
        Some(credentials) => Some(Arc::new(OpcLogStore::new(
            credentials,
            config.log_store.timeout(),
        )?)),
        None => None,
    };
    let exporter = LogExporter::new(
        store,
        LogArchive::new(&config.log_dir),
        config.log_store.timeout(),
        config.debug_mode,
    );

    let router = Router::new(
        RouterOptions::from(&config),
        catalog.clone(),
        registry.clone(),
        Arc::new(InMemorySettings::new()),
        Arc::new(exporter),
        Arc::new(app::ConsoleTransport),
    );
    info!(
        modules = catalog.len(),
        prefix = %config.prefix,
        log_dir = %config.log_dir.display(),
        "ktanesim ready"
    );

    let app = app::ConsoleApp::new(Dispatcher::new(Arc::new(router)), registry);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("ktanesim.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the chat, so diagnostics go to stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
