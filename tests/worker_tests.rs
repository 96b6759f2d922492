// Flush worker integration: spawn, tick, shutdown flushes the in-flight window

use access_stats::filter::FilterMetrics;
use access_stats::flush_worker::{FlushWorkerConfig, FlushWorkerDeps, spawn};
use access_stats::models::Application;
use access_stats::stats::StatsCollector;
use access_stats::stats_repo::StatsRepo;
use std::sync::Arc;
use tempfile::TempDir;

fn app() -> Application {
    Application {
        id: 1,
        name: "user-center".into(),
    }
}

async fn repo_in(dir: &TempDir) -> Arc<StatsRepo> {
    let path = dir.path().join("stats.db");
    let repo = Arc::new(StatsRepo::connect(path.to_str().unwrap(), 5).unwrap());
    repo.init().await.unwrap();
    repo
}

#[tokio::test]
async fn shutdown_flushes_the_in_flight_window() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;
    let collector = Arc::new(StatsCollector::new());

    collector.record("/a", 0.1);
    collector.record("/a", 0.3);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = spawn(
        FlushWorkerDeps {
            collector: collector.clone(),
            repo: repo.clone(),
            app: app(),
            metrics: Arc::new(FilterMetrics::default()),
            shutdown_rx,
        },
        FlushWorkerConfig {
            // Long enough that only the shutdown flush can run.
            flush_interval_secs: 3600,
            stats_log_interval_secs: 3600,
        },
    );

    // The interval's first tick fires at spawn, so the window lands either
    // in that flush or in the final shutdown flush; both must persist it.
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    let rows = repo.get_rows_for_path("/a").await.unwrap();
    assert!(!rows.is_empty(), "final flush should have written the window");
    let total: u64 = rows.iter().map(|r| r.count).sum();
    assert_eq!(total, 2);
    assert!(collector.is_empty());
}

#[tokio::test]
async fn periodic_tick_flushes_and_resets() {
    let dir = TempDir::new().unwrap();
    let repo = repo_in(&dir).await;
    let collector = Arc::new(StatsCollector::new());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = spawn(
        FlushWorkerDeps {
            collector: collector.clone(),
            repo: repo.clone(),
            app: app(),
            metrics: Arc::new(FilterMetrics::default()),
            shutdown_rx,
        },
        FlushWorkerConfig {
            flush_interval_secs: 1,
            stats_log_interval_secs: 3600,
        },
    );

    collector.record("/b", 0.5);
    tokio::time::sleep(tokio::time::Duration::from_millis(1300)).await;

    let rows = repo.get_rows_for_path("/b").await.unwrap();
    assert!(!rows.is_empty(), "tick flush should have written the window");

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
}
