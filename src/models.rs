// Snapshot rows: one per (path, flush cycle), latencies in milliseconds.

use std::collections::HashMap;

use crate::stats::LatencyAggregate;

/// One persisted row of the per-window access statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub app_id: i64,
    pub app_name: String,
    pub path: String,
    pub count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
}

/// Identity stamped onto every snapshot row.
#[derive(Debug, Clone)]
pub struct Application {
    pub id: i64,
    pub name: String,
}

/// Turns a drained window into snapshot rows. Paths with no observations
/// produce no row. Seconds are converted to milliseconds here, at snapshot
/// time, so accumulation never carries rounding from the unit conversion.
/// Rows come back sorted by path for stable logs and deterministic tests.
pub fn snapshot_rows(
    table: &HashMap<String, LatencyAggregate>,
    app: &Application,
) -> Vec<SnapshotRow> {
    let mut rows: Vec<SnapshotRow> = table
        .iter()
        .filter(|(_, agg)| agg.count > 0)
        .map(|(path, agg)| SnapshotRow {
            app_id: app.id,
            app_name: app.name.clone(),
            path: path.clone(),
            count: agg.count,
            avg_latency_ms: (agg.sum / agg.count as f64) * 1000.0,
            min_latency_ms: agg.min * 1000.0,
            max_latency_ms: agg.max * 1000.0,
        })
        .collect();
    rows.sort_by(|a, b| a.path.cmp(&b.path));
    rows
}
