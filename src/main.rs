use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use txgate::notification::webhook::WebhookNotifier;
use txgate::queue::ApprovalQueue;
use txgate::store::snapshot::SnapshotStore;
use txgate::{api, config, jobs};

#[derive(Parser)]
#[command(name = "txgate", about = "Transaction approval gateway")]
struct Cli {
    /// Port for the operator API. Overrides TXGATE_PORT.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "txgate=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let cli = Cli::parse();
    let port = cli.port.unwrap_or(cfg.port);

    // Crash recovery: reloaded items have no completion handles, so the
    // prior pending set is discarded and the snapshot reset to empty.
    let store = Arc::new(SnapshotStore::new(&cfg.snapshot_path));
    let discarded = store.recover().await?;
    if discarded > 0 {
        tracing::warn!(discarded, "abandoned approvals from previous run must be re-submitted");
    }

    let notifier = Arc::new(WebhookNotifier::new(cfg.operator_webhook_url.clone()));
    let queue = Arc::new(ApprovalQueue::new(cfg.policy.clone(), notifier, store));

    jobs::sweeper::spawn(queue.clone(), cfg.policy.sweep_interval_secs);

    let state = Arc::new(api::AppState { queue });
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "txgate listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
