use access_stats::*;
use anyhow::Result;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter_env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter_env)
        .init();

    let app_config = config::AppConfig::load()?;

    let pattern = extract::LogPattern::new(&app_config.ingest.format)?;
    let collector = Arc::new(stats::StatsCollector::new());
    let metrics = Arc::new(filter::FilterMetrics::default());
    let stats_filter = filter::AccessStatsFilter::new(
        app_config.ingest.source_field.clone(),
        pattern,
        collector.clone(),
        metrics.clone(),
    );

    let repo = Arc::new(stats_repo::StatsRepo::connect(
        &app_config.database.path,
        app_config.database.max_pool_size,
    )?);
    // Degrade, don't crash: with the store unreachable, statistics still
    // accumulate and flushes keep failing (and logging) until it recovers.
    // Schema creation is retried from the write path, so no restart is
    // needed once the store is back.
    if let Err(e) = repo.ping().await {
        tracing::error!(error = %e, "statistics store unavailable; flushes will fail until it recovers");
    } else if let Err(e) = repo.init().await {
        tracing::error!(error = %e, "statistics store schema init failed; retried on next flush");
    }

    let app = models::Application {
        id: app_config.application.id,
        name: app_config.application.name.clone(),
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = flush_worker::spawn(
        flush_worker::FlushWorkerDeps {
            collector: collector.clone(),
            repo: repo.clone(),
            app,
            metrics,
            shutdown_rx,
        },
        flush_worker::FlushWorkerConfig {
            flush_interval_secs: app_config.flush.interval_secs,
            stats_log_interval_secs: app_config.flush.stats_log_interval_secs,
        },
    );

    tracing::info!(
        source_field = %app_config.ingest.source_field,
        flush_interval_secs = app_config.flush.interval_secs,
        "access statistics filter started; reading records from stdin"
    );

    let source_field = app_config.ingest.source_field;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    tokio::select! {
        result = async {
            while let Some(line) = lines.next_line().await? {
                let mut event = event::LogEvent::from_field(&source_field, &line);
                stats_filter.apply(&mut event);
            }
            Ok::<(), std::io::Error>(())
        } => {
            result?;
            tracing::info!("input exhausted");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("received shutdown signal");
        }
    }

    // Let the in-flight window flush before exiting.
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;

    Ok(())
}
