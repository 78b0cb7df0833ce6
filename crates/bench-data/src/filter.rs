//! Cohort filtering for cross-CPU comparisons.
//!
//! An instance (one execution environment) runs a fixed sequence of
//! invocations: one cold start followed by warm ones. The filter keeps only
//! instances that completed the whole sequence, optionally drops the cold
//! start, and removes instances whose mean metric is extreme relative to
//! other instances on the same CPU.

use std::collections::{BTreeMap, HashMap, HashSet};

use bench_core::cpus::clean_cpu_string;
use bench_core::models::{
    CohortSelection, FilterOptions, InvocationRecord, INVOCATIONS_PER_INSTANCE,
};
use bench_core::stats::{mean, PercentileBand};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// What the filter removed at each stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterReport {
    /// Column whose instance means decided outliers.
    pub metric: String,
    pub selected_rows: usize,
    pub complete_instances: usize,
    pub incomplete_instances: usize,
    pub cold_rows_removed: usize,
    pub outlier_instances: usize,
    pub remaining_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CohortOutcome {
    /// Surviving rows in input order, with normalised CPU labels.
    pub rows: Vec<InvocationRecord>,
    pub report: FilterReport,
}

/// `(cpu_type, timestamp)` outlier group; timestamp only when grouping on it.
type CohortKey = (String, Option<DateTime<Utc>>);

/// Select one cohort from `records` and clean it.
pub fn filter_cpu_data(
    records: &[InvocationRecord],
    selection: &CohortSelection,
    options: &FilterOptions,
) -> CohortOutcome {
    let metric = selection.benchmark.metric_field();
    let mut report = FilterReport {
        metric: metric.to_string(),
        ..FilterReport::default()
    };

    let mut rows: Vec<InvocationRecord> = records
        .iter()
        .filter(|r| selection.matches(r))
        .map(|r| {
            let mut row = r.clone();
            row.cpu_type = clean_cpu_string(&r.cpu_type);
            row
        })
        .collect();
    report.selected_rows = rows.len();

    if rows.is_empty() {
        info!(
            "No data found for {} - {}MB - {} - region: {}",
            selection.provider,
            selection.memory_size_mb,
            selection.benchmark,
            selection.region.as_deref().unwrap_or("any")
        );
        return CohortOutcome { rows, report };
    }

    // Completeness
    let mut per_instance: HashMap<String, usize> = HashMap::new();
    for row in &rows {
        *per_instance.entry(row.instance_id.clone()).or_default() += 1;
    }
    report.complete_instances = per_instance
        .values()
        .filter(|&&n| n == INVOCATIONS_PER_INSTANCE)
        .count();
    report.incomplete_instances = per_instance.len() - report.complete_instances;
    rows.retain(|r| per_instance.get(&r.instance_id) == Some(&INVOCATIONS_PER_INSTANCE));

    if options.remove_cold {
        let before = rows.len();
        rows.retain(InvocationRecord::is_warm_start);
        report.cold_rows_removed = before - rows.len();
    }

    if !options.no_outlier_filter {
        let outliers = outlier_instances(&rows, metric, options);
        report.outlier_instances = outliers.len();
        rows.retain(|r| !outliers.contains(&r.instance_id));
    }

    report.remaining_rows = rows.len();
    debug!(
        "Cohort {} - {}MB - {}: {} of {} rows kept",
        selection.provider,
        selection.memory_size_mb,
        selection.benchmark,
        report.remaining_rows,
        report.selected_rows
    );

    CohortOutcome { rows, report }
}

/// Instance ids whose mean `metric` falls outside the percentile band of
/// their CPU group.
fn outlier_instances(
    rows: &[InvocationRecord],
    metric: &str,
    options: &FilterOptions,
) -> HashSet<String> {
    let mut samples: BTreeMap<(String, CohortKey), Vec<f64>> = BTreeMap::new();
    for row in rows {
        let group = (
            row.cpu_type.clone(),
            options.group_on_timestamp.then_some(row.timestamp),
        );
        let values = samples.entry((row.instance_id.clone(), group)).or_default();
        if let Some(v) = row.metric(metric) {
            values.push(v);
        }
    }

    let mut cohorts: BTreeMap<CohortKey, Vec<(String, f64)>> = BTreeMap::new();
    for ((instance_id, group), values) in samples {
        // Instances with no metric value at all are never flagged.
        if let Some(m) = mean(&values) {
            cohorts.entry(group).or_default().push((instance_id, m));
        }
    }

    let mut flagged = HashSet::new();
    for ((cpu_type, _), instances) in &cohorts {
        let means: Vec<f64> = instances.iter().map(|(_, m)| *m).collect();
        let Some(band) =
            PercentileBand::from_values(&means, options.lower_quantile, options.upper_quantile)
        else {
            continue;
        };
        for (instance_id, m) in instances {
            if band.is_outlier(*m) {
                debug!(
                    "Outlier instance {} on {}: mean {:.3} outside [{:.3}, {:.3}]",
                    instance_id, cpu_type, m, band.low, band.high
                );
                flagged.insert(instance_id.clone());
            }
        }
    }
    flagged
}

// ── Tests ─────────────────────────────────────────────────────────────────────
