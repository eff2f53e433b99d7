use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::orchestrator::DisplayOrchestrator;

/// Periodic refresh loop. The first tick fires immediately; each tick runs
/// on the blocking pool and the loop waits for it before sleeping, so ticks
/// never overlap. A failed tick is logged and the loop carries on.
pub async fn run(
    orchestrator: Arc<DisplayOrchestrator>,
    period: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    info!(period = %humantime::format_duration(period), "refresh scheduler started");
    loop {
        let tick = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::task::spawn_blocking(move || orchestrator.tick())
        };
        match tick.await {
            Ok(outcome) => debug!(?outcome, "tick finished"),
            Err(err) => error!("refresh tick panicked: {err}"),
        }

        info!("waiting for {}", humantime::format_duration(period));
        select! {
            _ = cancel.cancelled() => break,
            _ = sleep(period) => {}
        }
    }
    info!("refresh scheduler stopped");
    Ok(())
}
