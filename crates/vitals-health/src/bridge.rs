//! Metrics bridge — turns heartbeat stats into aggregator data points.

use vitals_core::{DataPoint, MetricKind, Stats};
use vitals_metrics::MetricsSink;

/// Four data points per stats entry, grouped by entry, in [`MetricKind::ALL`] order.
pub fn data_points(stats: &[Stats]) -> Vec<DataPoint> {
    let mut points = Vec::with_capacity(stats.len() * MetricKind::ALL.len());
    for s in stats {
        for kind in MetricKind::ALL {
            let value = match kind {
                MetricKind::Cpu => s.cpu,
                MetricKind::Memory => s.memory,
                MetricKind::Threads => s.threads as f64,
                MetricKind::ConcurrencyUnits => s.concurrency_units as f64,
            };
            points.push(DataPoint::new(kind, s.service_id.clone(), s.ts, value));
        }
    }
    points
}

/// Append every data point derived from `stats` to `sink`. Returns the count.
pub async fn forward(sink: &dyn MetricsSink, stats: &[Stats]) -> usize {
    let points = data_points(stats);
    let count = points.len();
    for point in points {
        sink.add_data_point(point).await;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_metrics::MetricsAggregator;

    fn stats(service_id: &str, ts: i64) -> Stats {
        Stats {
            service_id: service_id.to_string(),
            ts,
            cpu: 0.5,
            memory: 0.2,
            threads: 4,
            concurrency_units: 10,
        }
    }

    #[test]
    fn four_points_per_entry() {
        let points = data_points(&[stats("svc-a", 100)]);
        assert_eq!(
            points,
            vec![
                DataPoint::new(MetricKind::Cpu, "svc-a", 100, 0.5),
                DataPoint::new(MetricKind::Memory, "svc-a", 100, 0.2),
                DataPoint::new(MetricKind::Threads, "svc-a", 100, 4.0),
                DataPoint::new(MetricKind::ConcurrencyUnits, "svc-a", 100, 10.0),
            ]
        );
    }

    #[test]
    fn entries_stay_grouped_and_unfiltered() {
        // Duplicates are forwarded as-is.
        let input = vec![stats("svc-a", 1), stats("svc-b", 2), stats("svc-a", 1)];
        let points = data_points(&input);
        assert_eq!(points.len(), 12);

        for (chunk, s) in points.chunks(4).zip(&input) {
            assert!(chunk.iter().all(|p| p.service_id == s.service_id && p.ts == s.ts));
            let kinds: Vec<_> = chunk.iter().map(|p| p.metric).collect();
            assert_eq!(kinds, MetricKind::ALL);
        }
    }

    #[test]
    fn no_stats_no_points() {
        assert!(data_points(&[]).is_empty());
    }

    #[tokio::test]
    async fn forward_appends_to_sink() {
        let agg = MetricsAggregator::new(16);
        let n = forward(&agg, &[stats("svc-a", 100), stats("svc-b", 100)]).await;
        assert_eq!(n, 8);
        assert_eq!(agg.accepted(), 8);
        assert_eq!(agg.services().await, vec!["svc-a", "svc-b"]);
    }
}
