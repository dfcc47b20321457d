use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::services::recommender::Recommender;

/// Handle for stopping the periodic refresh task
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signals the task and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Refresh task ended abnormally");
        }
        tracing::info!("Refresh task stopped");
    }
}

/// Spawns a task that re-ranks the live session every `period`
///
/// The first refresh happens one full period after spawning. Ticks that find
/// the session not yet initialized are skipped.
pub fn spawn_refresh_loop(recommender: Arc<RwLock<Recommender>>, period: Duration) -> RefreshHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let task = tokio::spawn(refresh_task(recommender, period, shutdown_rx));
    RefreshHandle { shutdown_tx, task }
}

async fn refresh_task(
    recommender: Arc<RwLock<Recommender>>,
    period: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!(period_secs = period.as_secs(), "Refresh task started");
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut session = recommender.write().await;
                let limit = session.settings().limit;
                match session.refresh(limit) {
                    Ok(list) => tracing::info!(
                        cycle = session.cycles(),
                        count = list.len(),
                        "Periodic refresh"
                    ),
                    Err(e) => tracing::debug!(error = %e, "Periodic refresh skipped"),
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
