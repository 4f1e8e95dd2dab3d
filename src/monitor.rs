//! Records per-query durations for the archival and trends query paths.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::Serialize;

/// Queries slower than this are logged at the `warn` level.
const SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(500);

/// Collects duration samples per query label.
///
/// Recording is fire-and-forget: failures to take the internal lock are
/// ignored rather than propagated into the query path.
#[derive(Debug, Clone, Default)]
pub struct QueryMonitor {
    stats: Arc<Mutex<BTreeMap<&'static str, LabelStats>>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct LabelStats {
    count: u64,
    total: Duration,
    max: Duration,
}

/// A snapshot of the samples recorded under one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySample {
    /// The query label.
    pub label: &'static str,
    /// How many times the query ran since the last reset.
    pub count: u64,
    /// Total time spent in the query, in milliseconds.
    pub total_ms: u128,
    /// The slowest single run, in milliseconds.
    pub max_ms: u128,
}

impl QueryMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one run of the query named by `label`.
    pub fn record_query(&self, label: &'static str, duration: Duration) {
        if duration >= SLOW_QUERY_THRESHOLD {
            tracing::warn!("slow query {label} took {}ms", duration.as_millis());
        } else {
            tracing::debug!("query {label} took {}ms", duration.as_millis());
        }

        let Ok(mut stats) = self.stats.lock() else {
            return;
        };

        let entry = stats.entry(label).or_default();
        entry.count += 1;
        entry.total += duration;
        entry.max = entry.max.max(duration);
    }

    /// Clear all recorded samples.
    pub fn reset(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.clear();
        }
    }

    /// A snapshot of the recorded samples, sorted by label.
    pub fn snapshot(&self) -> Vec<QuerySample> {
        let Ok(stats) = self.stats.lock() else {
            return Vec::new();
        };

        stats
            .iter()
            .map(|(label, entry)| QuerySample {
                label,
                count: entry.count,
                total_ms: entry.total.as_millis(),
                max_ms: entry.max.as_millis(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::QueryMonitor;

    #[test]
    fn record_query_accumulates_per_label() {
        let monitor = QueryMonitor::new();

        monitor.record_query("archive_old_data", Duration::from_millis(20));
        monitor.record_query("archive_old_data", Duration::from_millis(40));
        monitor.record_query("trends", Duration::from_millis(5));

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].label, "archive_old_data");
        assert_eq!(snapshot[0].count, 2);
        assert_eq!(snapshot[0].total_ms, 60);
        assert_eq!(snapshot[0].max_ms, 40);
    }

    #[test]
    fn reset_clears_all_samples() {
        let monitor = QueryMonitor::new();
        monitor.record_query("trends", Duration::from_millis(5));

        monitor.reset();

        assert!(monitor.snapshot().is_empty());
    }
}
