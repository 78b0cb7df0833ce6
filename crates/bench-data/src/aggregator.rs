//! Per-CPU summaries of a filtered cohort.

use std::collections::{BTreeMap, BTreeSet};

use bench_core::models::InvocationRecord;
use bench_core::stats::{mean, percentile, sorted};
use serde::Serialize;

// ── CpuAccumulator ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CpuAccumulator {
    rows: usize,
    instances: BTreeSet<String>,
    values: Vec<f64>,
    costs: Vec<f64>,
}

impl CpuAccumulator {
    fn add_row(&mut self, row: &InvocationRecord, metric: &str) {
        self.rows += 1;
        self.instances.insert(row.instance_id.clone());
        if let Some(v) = row.metric(metric) {
            self.values.push(v);
        }
        if let Some(cost) = row.invocation_cost() {
            self.costs.push(cost);
        }
    }

    fn finish(self, cpu_type: String) -> CpuSummary {
        let data = sorted(&self.values);
        let pct = |p: f64| (!data.is_empty()).then(|| percentile(&data, p));
        CpuSummary {
            cpu_type,
            rows: self.rows,
            instances: self.instances.len(),
            samples: data.len(),
            mean: mean(&data),
            median: pct(50.0),
            p5: pct(5.0),
            p95: pct(95.0),
            mean_cost_usd: mean(&self.costs),
        }
    }
}

// ── CpuSummary ────────────────────────────────────────────────────────────────

/// Distribution of one metric on one CPU type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuSummary {
    pub cpu_type: String,
    pub rows: usize,
    /// Distinct instances contributing rows.
    pub instances: usize,
    /// Rows that carried a value for the metric.
    pub samples: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub p5: Option<f64>,
    pub p95: Option<f64>,
    /// Mean per-invocation cost, from billed duration where available.
    pub mean_cost_usd: Option<f64>,
}

/// Summarise `metric` per CPU type, sorted by CPU label.
pub fn summarize_by_cpu(rows: &[InvocationRecord], metric: &str) -> Vec<CpuSummary> {
    let mut groups: BTreeMap<String, CpuAccumulator> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.cpu_type.clone())
            .or_default()
            .add_row(row, metric);
    }

    groups
        .into_iter()
        .map(|(cpu_type, acc)| acc.finish(cpu_type))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::models::{BenchmarkMetrics, BenchmarkType, Provider};
    use bench_core::pricing::calculate_cost;

    fn row(instance: &str, cpu: &str, hash_ms: Option<f64>) -> InvocationRecord {
        InvocationRecord {
            provider: Provider::Aws,
            memory_size_mb: 1024,
            instance_id: instance.to_string(),
            cpu_type: cpu.to_string(),
            runtime_ms: Some(1000.0),
            benchmark_type: BenchmarkType::Sha256,
            metrics: BenchmarkMetrics::Sha256 {
                hash_size_mb: Some(64.0),
                hash_time_ms: hash_ms,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_sorted_by_cpu() {
        let rows = vec![
            row("i-1", "Intel Xeon", Some(10.0)),
            row("i-2", "AMD EPYC", Some(20.0)),
        ];
        let summary = summarize_by_cpu(&rows, "hash_time_ms");
        let cpus: Vec<&str> = summary.iter().map(|s| s.cpu_type.as_str()).collect();
        assert_eq!(cpus, vec!["AMD EPYC", "Intel Xeon"]);
    }

    #[test]
    fn test_summary_statistics() {
        let rows: Vec<InvocationRecord> = (1..=5)
            .map(|i| row(&format!("i-{}", i % 2), "Intel Xeon", Some(i as f64 * 10.0)))
            .collect();
        let summary = summarize_by_cpu(&rows, "hash_time_ms");
        let s = &summary[0];
        assert_eq!(s.rows, 5);
        assert_eq!(s.instances, 2);
        assert_eq!(s.samples, 5);
        assert_eq!(s.mean, Some(30.0));
        assert_eq!(s.median, Some(30.0));
        assert!((s.p5.unwrap() - 12.0).abs() < 1e-9);
        assert!((s.p95.unwrap() - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_without_metric_values() {
        let rows = vec![row("i-1", "Intel Xeon", None)];
        let s = &summarize_by_cpu(&rows, "hash_time_ms")[0];
        assert_eq!(s.rows, 1);
        assert_eq!(s.samples, 0);
        assert_eq!(s.mean, None);
        assert_eq!(s.median, None);
    }

    #[test]
    fn test_summary_cost_prefers_billed_duration() {
        let mut billed = row("i-1", "Intel Xeon", Some(1.0));
        billed.billing.billed_duration_ms = Some(2000.0);
        let unbilled = row("i-2", "Intel Xeon", Some(1.0));

        let s = &summarize_by_cpu(&[billed, unbilled], "hash_time_ms")[0];
        let expected = (calculate_cost(&Provider::Aws, 1024, 2000.0)
            + calculate_cost(&Provider::Aws, 1024, 1000.0))
            / 2.0;
        assert!((s.mean_cost_usd.unwrap() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_summary_empty() {
        assert!(summarize_by_cpu(&[], "runtime_ms").is_empty());
    }
}
