// Filter boundary tests: pipeline-terminal signal, tagging, error absorption

use access_stats::event::{DROP_TAG, LogEvent};
use access_stats::extract::{DEFAULT_COMBINED_PATTERN, LogPattern};
use access_stats::filter::{AccessStatsFilter, FilterMetrics};
use access_stats::stats::StatsCollector;
use std::sync::Arc;
use std::sync::atomic::Ordering;

const GOOD_LINE: &str = "192.168.1.10 - - [27/Aug/2026:10:00:00 +0000] \"GET /api/users?id=5 HTTP/1.1\" 200 512 \"-\" \"curl/8.0.1\" \"-\" 0.100 0.123";

fn filter() -> (AccessStatsFilter, Arc<StatsCollector>, Arc<FilterMetrics>) {
    let collector = Arc::new(StatsCollector::new());
    let metrics = Arc::new(FilterMetrics::default());
    let f = AccessStatsFilter::new(
        "message".into(),
        LogPattern::new(DEFAULT_COMBINED_PATTERN).unwrap(),
        collector.clone(),
        metrics.clone(),
    );
    (f, collector, metrics)
}

#[test]
fn matched_record_is_recorded_and_terminal() {
    let (filter, collector, metrics) = filter();
    let mut event = LogEvent::from_field("message", GOOD_LINE);

    let keep_going = filter.apply(&mut event);
    assert!(!keep_going);
    assert!(event.has_tag(DROP_TAG));

    let agg = collector.get("/api/users").expect("sample recorded");
    assert_eq!(agg.count, 1);
    assert_eq!(agg.min, 0.123);
    assert_eq!(metrics.records_accepted.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.records_rejected.load(Ordering::Relaxed), 0);
}

#[test]
fn unmatched_record_is_tagged_and_terminal() {
    let (filter, collector, metrics) = filter();
    let mut event = LogEvent::from_field("message", "garbage line");

    let keep_going = filter.apply(&mut event);
    assert!(!keep_going);
    assert!(event.has_tag(DROP_TAG));
    assert_eq!(event.get_str("access_stats_error"), "malformed_record");
    assert!(collector.is_empty());
    assert_eq!(metrics.records_rejected.load(Ordering::Relaxed), 1);
}

#[test]
fn dash_latency_records_no_phantom_zero_sample() {
    let (filter, collector, _) = filter();
    let bad = GOOD_LINE.replace(" 0.123", " -");
    let mut event = LogEvent::from_field("message", &bad);

    filter.apply(&mut event);
    assert_eq!(event.get_str("access_stats_error"), "malformed_latency");
    assert!(collector.get("/api/users").is_none());
}

#[test]
fn missing_source_field_is_rejected_not_a_panic() {
    let (filter, collector, metrics) = filter();
    let mut event = LogEvent::default();

    let keep_going = filter.apply(&mut event);
    assert!(!keep_going);
    assert!(collector.is_empty());
    assert_eq!(metrics.records_seen.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.records_rejected.load(Ordering::Relaxed), 1);
}

#[test]
fn repeated_paths_accumulate_into_one_aggregate() {
    let (filter, collector, _) = filter();
    for latency in ["0.100", "0.200", "0.300"] {
        let line = GOOD_LINE.replace(" 0.123", &format!(" {}", latency));
        let mut event = LogEvent::from_field("message", &line);
        filter.apply(&mut event);
    }

    let agg = collector.get("/api/users").unwrap();
    assert_eq!(agg.count, 3);
    assert_eq!(agg.min, 0.1);
    assert_eq!(agg.max, 0.3);
}
