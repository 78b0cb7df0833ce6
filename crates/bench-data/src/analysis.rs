//! End-to-end benchmark pipeline.
//!
//! Loads the log corpus, reconciles it with every configured billing export
//! and, when a cohort is selected, filters it and summarises it per CPU.

use std::path::{Path, PathBuf};

use bench_core::models::{CohortSelection, FilterOptions, InvocationRecord, Provider};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::aggregator::{summarize_by_cpu, CpuSummary};
use crate::billing::{inject_billing, load_provider_billing, BillingBatch, ReconcileReport};
use crate::filter::{filter_cpu_data, FilterReport};
use crate::reader::{load_records_from_directory, LoadReport};

// ── Public types ──────────────────────────────────────────────────────────────

/// Billing outcome for one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderBilling {
    pub root: PathBuf,
    pub batch: BillingBatch,
    pub reconcile: ReconcileReport,
}

/// Every record of the corpus, with billing merged in.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<InvocationRecord>,
    pub load: LoadReport,
    pub billing: Vec<ProviderBilling>,
    /// Wall-clock seconds spent loading and reconciling.
    pub build_time_seconds: f64,
}

/// A filtered cohort and its per-CPU breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct CohortAnalysis {
    pub selection: CohortSelection,
    pub filter: FilterReport,
    pub cpus: Vec<CpuSummary>,
}

/// Serialisable digest of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    pub build_time_seconds: f64,
    pub load: LoadReport,
    pub billing: Vec<ProviderBilling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohort: Option<CohortAnalysis>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Load `log_dir` and reconcile it with each `(provider, export root)`.
pub fn build_dataset(log_dir: &Path, billing_roots: &[(Provider, PathBuf)]) -> Dataset {
    let start = std::time::Instant::now();
    let (mut records, load) = load_records_from_directory(log_dir);

    let billing = billing_roots
        .iter()
        .map(|(provider, root)| {
            let batch = load_provider_billing(provider, root);
            let reconcile = inject_billing(&mut records, provider, &batch.records);
            ProviderBilling {
                root: root.clone(),
                batch,
                reconcile,
            }
        })
        .collect();

    let build_time_seconds = start.elapsed().as_secs_f64();
    info!(
        "Built dataset of {} records in {:.3}s",
        records.len(),
        build_time_seconds
    );

    Dataset {
        records,
        load,
        billing,
        build_time_seconds,
    }
}

/// Filter one cohort out of `records` and summarise its metric per CPU.
pub fn analyze_cohort(
    records: &[InvocationRecord],
    selection: &CohortSelection,
    options: &FilterOptions,
) -> CohortAnalysis {
    let outcome = filter_cpu_data(records, selection, options);
    let cpus = summarize_by_cpu(&outcome.rows, &outcome.report.metric);
    CohortAnalysis {
        selection: selection.clone(),
        filter: outcome.report,
        cpus,
    }
}

/// Run the whole pipeline and collect its report.
pub fn run_pipeline(
    log_dir: &Path,
    billing_roots: &[(Provider, PathBuf)],
    cohort: Option<(&CohortSelection, &FilterOptions)>,
) -> PipelineReport {
    let dataset = build_dataset(log_dir, billing_roots);
    let cohort = cohort
        .map(|(selection, options)| analyze_cohort(&dataset.records, selection, options));

    PipelineReport {
        generated_at: Utc::now().to_rfc3339(),
        build_time_seconds: dataset.build_time_seconds,
        load: dataset.load,
        billing: dataset.billing,
        cohort,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
