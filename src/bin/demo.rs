//! Demonstration binary: bootstraps the engine against an in-memory store
//! and exercises a write followed by a query, standing in for the external
//! handler that would otherwise drive the engine over HTTP or a queue
//! (out of scope here — see DESIGN.md).

use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use object_store::memory::InMemory;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use ev_receipt_index::config::EngineConfig;
use ev_receipt_index::model::{PartialReceiptMetadata, ReceiptQuery};
use ev_receipt_index::{pipeline, Engine, Store};

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = Store::new(Arc::new(InMemory::new()));
    let engine = Engine::new(store.clone(), EngineConfig::from_env())?;
    info!("engine initialized");

    let write_result = pipeline::store(
        &store,
        Bytes::from_static(b"%PDF-1.4 demo receipt"),
        PartialReceiptMetadata {
            session_id: "demo-session-001".to_string(),
            consumer_id: "demo-consumer".to_string(),
            receipt_number: "EVC-2025-DEMO".to_string(),
            payment_date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            card_last_four: "4242".to_string(),
            amount: "£12.75".to_string(),
        },
    )
    .await?;
    info!(index_key = %write_result.index_key, "wrote demo receipt");

    let mut query = ReceiptQuery::default();
    query.session_id = Some("demo-session-001".to_string());
    let result = engine.query(query, CancellationToken::new()).await?;
    info!(total = result.total_count, "query returned results");

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = tokio::time::sleep(std::time::Duration::from_millis(1)) => {}
    }

    Ok(())
}
