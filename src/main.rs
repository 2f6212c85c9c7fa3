use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use basicdb::backend::memory::MemoryBackend;
use basicdb::backend::filesystem::FilesystemBackend;
use basicdb::backend::remote_kv::local::LocalKvStore;
use basicdb::backend::remote_kv::RemoteKvBackend;
use basicdb::backend::StorageBackend;
use basicdb::config::{Backend, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let backend: Arc<dyn StorageBackend> = match cli.backend {
        Backend::Memory => Arc::new(MemoryBackend::new()),
        Backend::Filesystem => Arc::new(FilesystemBackend::new(cli.data_dir.clone())?),
        Backend::RemoteKv => Arc::new(RemoteKvBackend::new(LocalKvStore::new())),
    };

    let app = basicdb::http::router(backend).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    tracing::info!(addr = %cli.listen, backend = ?cli.backend, "basicdb listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
