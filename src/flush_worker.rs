// Background flush worker: every interval, detach the current window from
// the collector and write one row per observed path to the store. A failed
// row is logged and skipped; the loop only exits on shutdown, after one
// final best-effort flush of the in-flight window.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::filter::FilterMetrics;
use crate::models::{Application, snapshot_rows};
use crate::stats::StatsCollector;
use crate::stats_repo::StatsRepo;

/// Flush timing and app-stats logging config.
#[derive(Debug, Clone)]
pub struct FlushWorkerConfig {
    pub flush_interval_secs: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Shared state and shutdown for the worker.
pub struct FlushWorkerDeps {
    pub collector: Arc<StatsCollector>,
    pub repo: Arc<StatsRepo>,
    pub app: Application,
    pub metrics: Arc<FilterMetrics>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Spawns the flush worker. Returns a join handle; awaiting it after
/// signalling shutdown waits for the final flush to complete.
pub fn spawn(deps: FlushWorkerDeps, config: FlushWorkerConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(deps, config).await;
    })
}

#[instrument(skip(deps), fields(interval_secs = config.flush_interval_secs))]
async fn run(deps: FlushWorkerDeps, config: FlushWorkerConfig) {
    let FlushWorkerDeps {
        collector,
        repo,
        app,
        metrics,
        mut shutdown_rx,
    } = deps;

    let mut flush_tick = tokio::time::interval(Duration::from_secs(config.flush_interval_secs));
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats_log_tick =
        tokio::time::interval(Duration::from_secs(config.stats_log_interval_secs));
    stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rows_written_total: u64 = 0;
    let mut rows_failed_total: u64 = 0;

    loop {
        tokio::select! {
            _ = flush_tick.tick() => {
                let (written, failed) = run_one_flush(&collector, &repo, &app).await;
                rows_written_total += written as u64;
                rows_failed_total += failed as u64;
            }
            _ = stats_log_tick.tick() => {
                info!(
                    records_seen = metrics.records_seen.load(std::sync::atomic::Ordering::Relaxed),
                    records_accepted = metrics.records_accepted.load(std::sync::atomic::Ordering::Relaxed),
                    records_rejected = metrics.records_rejected.load(std::sync::atomic::Ordering::Relaxed),
                    rows_written_total,
                    rows_failed_total,
                    "app stats"
                );
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("flush worker shutting down");
                let (written, failed) = run_one_flush(&collector, &repo, &app).await;
                if written > 0 || failed > 0 {
                    info!(rows_written = written, rows_failed = failed, "final flush");
                }
                break;
            }
        }
    }
}

/// Runs one flush cycle: detach the window, emit one row per observed path,
/// skip failed rows. Returns (rows written, rows failed). Used by the worker
/// loop and by tests.
pub async fn run_one_flush(
    collector: &StatsCollector,
    repo: &StatsRepo,
    app: &Application,
) -> (usize, usize) {
    let window = collector.drain();
    let rows = snapshot_rows(&window, app);
    if rows.is_empty() {
        return (0, 0);
    }

    let created_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|e| {
            warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        });

    let mut written = 0;
    let mut failed = 0;
    for row in &rows {
        // One bad row must not abort the rest of the cycle. Its window data
        // is lost; there is no retry.
        match repo.insert_row(created_at, row).await {
            Ok(()) => written += 1,
            Err(e) => {
                failed += 1;
                warn!(error = %e, path = %row.path, "snapshot row write failed");
            }
        }
    }

    if written > 0 {
        info!(rows_written = written, rows_failed = failed, "access statistics flushed");
    }
    (written, failed)
}
