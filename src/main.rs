use anyhow::Context;
use clap::Parser;
use sevasetu_rag::{
    api::{create_router, AppState},
    config::RagConfig,
    engine::RagSystem,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "sevasetu", version, about = "Multilingual government scheme assistant")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Vector store snapshot produced by the ingestion pipeline
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let snapshot = args
        .store
        .unwrap_or_else(|| PathBuf::from(&config.storage.snapshot_path));

    info!("Starting SevaSetu...");

    let rag_system = RagSystem::from_config(&config, &snapshot)
        .await
        .with_context(|| {
            format!(
                "failed to initialise the RAG system from {} (has the ingestion pipeline been run?)",
                snapshot.display()
            )
        })?;
    info!(documents = rag_system.document_count(), "RAG system ready");

    let app = create_router(AppState::new(Arc::new(rag_system)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {}", addr))?;

    info!("SevaSetu listening on {}", addr);
    info!("Query endpoint: http://{}/query", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
