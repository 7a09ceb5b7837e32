//! faw-watcher - Facial Affect Watcher daemon
//!
//! Watches a parent directory for per-conversation session folders, drains
//! image frames through the facial-landmark extraction backend and the
//! affect model, appends per-frame rows to per-session CSVs, and keeps a
//! running valence/arousal aggregate per conversation.
//!
//! Init order: tracing → config → database pool → scorer → extraction
//! backend → watcher. Shutdown: Ctrl-C cancels the token; workers finish
//! their current poll iteration, then the grace period applies.

use anyhow::Result;
use clap::Parser;
use faw_watcher::config::{BackendMode, Cli, WatcherConfig};
use faw_watcher::services::csv_sink::CsvSink;
use faw_watcher::services::extraction::{ContainerBackend, LocalProcessBackend};
use faw_watcher::services::scorer::SidecarScorer;
use faw_watcher::services::watcher::WatcherOptions;
use faw_watcher::{AffectScorer, FeatureExtraction, FramePipeline, SessionDirectoryWatcher};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting faw-watcher v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = WatcherConfig::load(&cli)?;

    std::fs::create_dir_all(&config.input_root)?;
    std::fs::create_dir_all(&config.output_root)?;
    info!(
        input_root = %config.input_root.display(),
        output_root = %config.output_root.display(),
        "Roots ready"
    );

    let pool = faw_watcher::db::init_database_pool(&config.database_path).await?;
    info!(database = %config.database_path.display(), "Database connection established");

    // Process-wide singletons, constructed once and passed down explicitly.
    let scorer: Arc<dyn AffectScorer> = {
        let command = config
            .scorer
            .command
            .clone()
            .ok_or_else(|| anyhow::anyhow!("scorer.command not configured"))?;
        info!(command = %command.display(), "Affect scorer ready");
        Arc::new(SidecarScorer::new(command))
    };

    let backend: Arc<dyn FeatureExtraction> = match config.backend.mode {
        BackendMode::Local => {
            info!(executable = %config.backend.executable, "Extraction backend: local process");
            Arc::new(LocalProcessBackend::new(config.backend.executable.clone().into()))
        }
        BackendMode::Container => {
            let container = config
                .backend
                .container_name
                .clone()
                .ok_or_else(|| anyhow::anyhow!("backend.container_name not configured"))?;
            let container_input_root = config
                .backend
                .container_input_root
                .clone()
                .ok_or_else(|| anyhow::anyhow!("backend.container_input_root not configured"))?;
            info!(container = %container, "Extraction backend: container");
            Arc::new(ContainerBackend::new(
                container,
                config.backend.executable.clone(),
                config.input_root.clone(),
                container_input_root,
            ))
        }
    };

    let pipeline = Arc::new(FramePipeline::new(
        backend,
        scorer,
        pool.clone(),
        CsvSink::new(config.output_root.clone()),
        config.extraction_timeout(),
    ));

    let cancel = CancellationToken::new();
    let watcher = SessionDirectoryWatcher::new(
        WatcherOptions {
            input_root: config.input_root.clone(),
            poll_interval: config.poll_interval(),
            idle_timeout: config.idle_timeout(),
            max_concurrent_sessions: config.max_concurrent_sessions,
            shutdown_grace: config.shutdown_grace(),
            failure_backoff: config.failure_backoff(),
        },
        pipeline,
        cancel.clone(),
    );

    let mut watcher_task = tokio::spawn(watcher.run());

    let result = tokio::select! {
        joined = &mut watcher_task => joined?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            cancel.cancel();
            // The watcher applies the grace period internally.
            watcher_task.await?
        }
    };

    pool.close().await;
    result?;
    info!("Clean shutdown");
    Ok(())
}
