// Per-path latency aggregates for the current flush window.
// Entries exist only after the first observation, so min never starts from a
// zero sentinel and a genuine 0.0 latency is representable.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Running aggregate for one request path within one window.
/// Invariant while present in the table: count >= 1 and
/// min <= sum / count <= max.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyAggregate {
    pub count: u64,
    /// Sum of observed latencies in seconds; mean is derived at snapshot time.
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl LatencyAggregate {
    fn first(latency_seconds: f64) -> Self {
        Self {
            count: 1,
            sum: latency_seconds,
            min: latency_seconds,
            max: latency_seconds,
        }
    }

    fn observe(&mut self, latency_seconds: f64) {
        self.count += 1;
        self.sum += latency_seconds;
        self.min = self.min.min(latency_seconds);
        self.max = self.max.max(latency_seconds);
    }
}

/// The aggregate table shared between the ingestion path and the flush
/// worker. A single mutex covers each read-modify-write, so the four fields
/// of an aggregate always move together; `drain` swaps the whole table out
/// so the flusher never holds the lock across persistence I/O.
#[derive(Default)]
pub struct StatsCollector {
    table: Mutex<HashMap<String, LatencyAggregate>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation. Short critical section; never blocks on I/O.
    pub fn record(&self, path: &str, latency_seconds: f64) {
        let mut table = self.table.lock();
        match table.get_mut(path) {
            Some(agg) => agg.observe(latency_seconds),
            None => {
                table.insert(path.to_string(), LatencyAggregate::first(latency_seconds));
            }
        }
    }

    /// Atomically detaches the current window and starts a fresh one.
    /// The caller owns the returned table and can walk it without contention.
    pub fn drain(&self) -> HashMap<String, LatencyAggregate> {
        std::mem::take(&mut *self.table.lock())
    }

    /// Number of paths in the current window. Test/diagnostic accessor.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of one path's aggregate, if observed this window.
    pub fn get(&self, path: &str) -> Option<LatencyAggregate> {
        self.table.lock().get(path).cloned()
    }
}
