// Per-record entry point. Extracts (path, latency) from the configured
// source field and records it into the collector. Matched or not, the record
// is consumed for statistics: apply() always returns false and tags the
// event as terminal. No per-record error escapes this boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::{DROP_TAG, LogEvent};
use crate::extract::{ExtractError, LogPattern};
use crate::stats::StatsCollector;

/// Relaxed counters for the periodic app-stats log line.
#[derive(Debug, Default)]
pub struct FilterMetrics {
    pub records_seen: AtomicU64,
    pub records_accepted: AtomicU64,
    pub records_rejected: AtomicU64,
}

pub struct AccessStatsFilter {
    source_field: String,
    pattern: LogPattern,
    collector: Arc<StatsCollector>,
    metrics: Arc<FilterMetrics>,
}

impl AccessStatsFilter {
    pub fn new(
        source_field: String,
        pattern: LogPattern,
        collector: Arc<StatsCollector>,
        metrics: Arc<FilterMetrics>,
    ) -> Self {
        Self {
            source_field,
            pattern,
            collector,
            metrics,
        }
    }

    /// Handles one pipeline event. Returns the "continue normal pipeline
    /// processing" signal, which is always false in this filter's role.
    pub fn apply(&self, event: &mut LogEvent) -> bool {
        self.metrics.records_seen.fetch_add(1, Ordering::Relaxed);
        let line = event.get_str(&self.source_field);

        match self.pattern.extract(line) {
            Ok(record) => {
                self.collector
                    .record(&record.path, record.latency_seconds);
                self.metrics
                    .records_accepted
                    .fetch_add(1, Ordering::Relaxed);
            }
            Err(reason) => {
                self.metrics
                    .records_rejected
                    .fetch_add(1, Ordering::Relaxed);
                event.set(
                    "access_stats_error",
                    serde_json::Value::String(reject_label(&reason).to_string()),
                );
                tracing::debug!(error = %reason, "record rejected from statistics");
            }
        }

        event.add_tag(DROP_TAG);
        false
    }
}

fn reject_label(reason: &ExtractError) -> &'static str {
    match reason {
        ExtractError::MalformedRecord => "malformed_record",
        ExtractError::MalformedRequestLine => "malformed_request_line",
        ExtractError::UnparsablePath => "unparsable_path",
        ExtractError::MalformedLatency => "malformed_latency",
    }
}
