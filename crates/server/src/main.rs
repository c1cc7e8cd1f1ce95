//! whoisit server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whoisit_core::config::{AppConfig, QueueConfig};
use whoisit_recognition::{Recognizer, RekognitionRecognizer};
use whoisit_server::{
    AnalysisWorker, AppState, LocalQueue, MessageQueue, SqsQueue, create_router,
};
use whoisit_storage::{NotifyingStore, ObjectStore};

/// whoisit - celebrity photo recognition and indexing server
#[derive(Parser, Debug)]
#[command(name = "whoisitd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "WHOISIT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Merge the optional config file with `WHOISIT_` environment variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    // WHOISIT_CONFIG and WHOISIT_SERVER only name the file and the CLI target
    let has_env_config = std::env::vars().any(|(key, _)| {
        key.starts_with("WHOISIT_") && key != "WHOISIT_CONFIG" && key != "WHOISIT_SERVER"
    });

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: whoisitd --config /path/to/config.toml\n  \
             2. Environment variables: WHOISIT_IMAGES__BUCKET=my-bucket \
             WHOISIT_IMAGES__REGION=us-east-1 WHOISIT_INDEX__UPLOAD_TABLE=uploads \
             WHOISIT_INDEX__IDENTITY_TABLE=identities whoisitd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set WHOISIT_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(
            Env::prefixed("WHOISIT_")
                .ignore(&["CONFIG", "SERVER"])
                .split("__"),
        )
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Resolve on Ctrl-C or SIGTERM, then cancel `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("whoisit v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    whoisit_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let sdk_config = whoisit_server::aws::sdk_config(&config.images, &config.aws);

    // Initialize storage backend
    let storage = whoisit_storage::from_config(
        &config.storage,
        &config.images,
        &config.aws,
        &sdk_config,
    )
    .await
    .context("failed to initialize storage")?;

    // The local queue is fed by the store itself after each write
    let local_queue = match &config.queue {
        QueueConfig::Local {
            redelivery_delay_secs,
            max_receive_count,
        } => Some(Arc::new(LocalQueue::new().with_redelivery(
            Duration::from_secs(*redelivery_delay_secs),
            *max_receive_count,
        ))),
        _ => None,
    };
    let storage: Arc<dyn ObjectStore> = match &local_queue {
        Some(queue) => Arc::new(NotifyingStore::new(
            storage,
            queue.clone(),
            config.images.bucket.clone(),
            config.images.region.clone(),
        )),
        None => storage,
    };
    tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Storage backend connectivity verified");

    // Initialize metadata store
    let metadata = whoisit_metadata::from_config(&config.metadata, &config.index)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    let recognizer: Arc<dyn Recognizer> =
        Arc::new(RekognitionRecognizer::from_sdk_config(&sdk_config));

    let state = AppState::new(config.clone(), storage, metadata, recognizer);

    let queue: Option<Arc<dyn MessageQueue>> = match &config.queue {
        QueueConfig::Disabled => None,
        QueueConfig::Local { .. } => local_queue.map(|queue| queue as Arc<dyn MessageQueue>),
        QueueConfig::Sqs {
            queue_url,
            max_messages,
            wait_time_secs,
        } => Some(Arc::new(SqsQueue::from_sdk_config(
            &sdk_config,
            queue_url.clone(),
            *max_messages,
            *wait_time_secs,
        ))),
    };

    let shutdown = CancellationToken::new();
    let worker_handle = match queue {
        Some(queue) => {
            let worker = AnalysisWorker::new(queue, state.analysis.clone());
            Some(tokio::spawn(worker.run(shutdown.clone())))
        }
        None => {
            tracing::info!("No queue configured, notifications accepted on /v1/notifications only");
            None
        }
    };

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = worker_handle {
        handle.await.context("analysis worker panicked")?;
    }

    Ok(())
}
