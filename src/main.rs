use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use points_ledger::config::Config;
use points_ledger::csv::seed;
use points_ledger::{Ledger, LedgerHandle, http, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _log_guard = logging::init(config.log_path.as_deref())?;

    let (ledger, ledger_task) = LedgerHandle::spawn(Ledger::new());

    if let Some(path) = &config.seed {
        if path.extension().is_none_or(|ext| ext != "csv") {
            warn!(path = %path.display(), "seed file seems to not be a csv file");
        }
        seed(&ledger, path)
            .await
            .with_context(|| format!("failed to seed ledger from {}", path.display()))?;
    }

    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "points ledger listening");

    axum::serve(listener, http::router(ledger))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // the router held the last handle, so the ledger task winds down now
    let ledger = ledger_task.await.context("ledger task failed")?;
    info!(
        transactions = ledger.transactions().len(),
        points = ledger.total_available(),
        "points ledger stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
