//! Prometheus text exposition format.
//!
//! Renders the latest data point of each series as a gauge labelled by
//! service, for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use vitals_core::{DataPoint, MetricKind};

fn help(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Cpu => "CPU utilization reported by the service.",
        MetricKind::Memory => "Memory utilization reported by the service.",
        MetricKind::Threads => "OS thread count reported by the service.",
        MetricKind::ConcurrencyUnits => {
            "Lightweight concurrency units (tasks, goroutines) reported by the service."
        }
    }
}

/// Render data points into Prometheus text format.
///
/// Every metric kind gets its HELP/TYPE header even with no samples.
pub fn render_prometheus(points: &[DataPoint]) -> String {
    let mut out = String::new();

    for kind in MetricKind::ALL {
        let name = format!("vitals_{}", kind.as_str());
        let _ = writeln!(out, "# HELP {name} {}", help(kind));
        let _ = writeln!(out, "# TYPE {name} gauge");
        for p in points.iter().filter(|p| p.metric == kind) {
            let _ = writeln!(
                out,
                "{name}{{service=\"{}\"}} {}",
                escape_label(&p.service_id),
                p.value
            );
        }
    }

    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_for(service: &str) -> Vec<DataPoint> {
        vec![
            DataPoint::new(MetricKind::Cpu, service, 100, 0.5),
            DataPoint::new(MetricKind::Memory, service, 100, 0.25),
            DataPoint::new(MetricKind::Threads, service, 100, 4.0),
            DataPoint::new(MetricKind::ConcurrencyUnits, service, 100, 10.0),
        ]
    }

    #[test]
    fn render_empty() {
        let output = render_prometheus(&[]);
        assert!(output.contains("# HELP vitals_cpu"));
        assert!(output.contains("# TYPE vitals_concurrency_units gauge"));
        assert!(!output.contains('{'));
    }

    #[test]
    fn render_single_service() {
        let output = render_prometheus(&points_for("svc-a"));

        assert!(output.contains("vitals_cpu{service=\"svc-a\"} 0.5\n"));
        assert!(output.contains("vitals_memory{service=\"svc-a\"} 0.25\n"));
        assert!(output.contains("vitals_threads{service=\"svc-a\"} 4\n"));
        assert!(output.contains("vitals_concurrency_units{service=\"svc-a\"} 10\n"));
    }

    #[test]
    fn render_escapes_label_values() {
        let points = vec![DataPoint::new(MetricKind::Cpu, "we\"ird\\id", 1, 1.0)];
        let output = render_prometheus(&points);
        assert!(output.contains("vitals_cpu{service=\"we\\\"ird\\\\id\"} 1\n"));
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let mut points = points_for("svc-a");
        points.extend(points_for("svc-b"));
        let output = render_prometheus(&points);

        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            assert!(
                line.contains('{') && line.contains('}'),
                "line should have labels: {line}"
            );
        }
        assert_eq!(output.lines().filter(|l| !l.starts_with('#')).count(), 8);
    }
}
