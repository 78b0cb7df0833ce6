//! Billing reconciliation.
//!
//! Every provider exports what it charged for each invocation through its own
//! log tooling. A [`BillingSource`] knows how to read one provider's CSV export
//! and normalise it into [`BillingRecord`]s keyed by the provider's invocation
//! id; [`inject_billing`] then merges those columns into the canonical records
//! carrying the same id.

pub mod alibaba;
pub mod aws;
pub mod azure;
pub mod gcp;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bench_core::error::{BenchError, Result};
use bench_core::models::{BillingOverlay, BillingRecord, InvocationRecord, Provider};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use alibaba::AlibabaBilling;
pub use aws::AwsBilling;
pub use azure::AzureBilling;
pub use gcp::GcpBilling;

// ── BillingSource ─────────────────────────────────────────────────────────────

/// One provider's billing export format.
pub trait BillingSource {
    /// A raw CSV row, deserialised by header name.
    type Row: DeserializeOwned;

    /// Header of the column holding the join key. A file without it is rejected.
    const KEY_COLUMN: &'static str;

    fn provider(&self) -> Provider;

    /// Invocation id of a row; rows without one are dropped.
    fn join_key(&self, row: &Self::Row) -> Option<String>;

    /// Billing columns of a row, or `None` when the row carries nothing usable.
    fn overlay(&self, row: &Self::Row) -> Option<BillingOverlay>;

    /// Read one export file.
    ///
    /// Rows may have differing lengths; rows that fail to decode are skipped.
    fn load(&self, path: &Path) -> Result<Vec<BillingRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let has_key = reader.headers()?.iter().any(|h| h == Self::KEY_COLUMN);
        if !has_key {
            return Err(BenchError::MissingColumn {
                column: Self::KEY_COLUMN.to_string(),
                path: path.to_path_buf(),
            });
        }

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<Self::Row>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    debug!("Skipping billing row in {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };
            let (Some(key), Some(overlay)) = (self.join_key(&row), self.overlay(&row)) else {
                skipped += 1;
                continue;
            };
            records.push(BillingRecord { key, overlay });
        }

        debug!(
            "Loaded {} {} billing rows from {} ({} skipped)",
            records.len(),
            self.provider(),
            path.display(),
            skipped
        );
        Ok(records)
    }
}

/// Parse a numeric CSV cell, mapping blanks and garbage to `None`.
pub fn tolerant_number(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Trimmed, non-empty text cell.
pub fn text_cell(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ── Batch loading ─────────────────────────────────────────────────────────────

/// A billing export that could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Every billing row found under one export root.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BillingBatch {
    #[serde(skip)]
    pub records: Vec<BillingRecord>,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub failures: Vec<BillingFailure>,
}

/// Find billing exports under `root`: `.csv` files whose name mentions
/// "billed" in any case. Sorted by path.
pub fn find_billing_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        warn!("Billing directory does not exist: {}", root.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            entry.file_type().is_file() && name.ends_with(".csv") && name.contains("billed")
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load every export under `root` with `source`, in path order.
pub fn load_all_billing<S: BillingSource>(source: &S, root: &Path) -> BillingBatch {
    let mut batch = BillingBatch::default();

    for path in find_billing_files(root) {
        match source.load(&path) {
            Ok(records) => {
                batch.files_loaded += 1;
                batch.records.extend(records);
            }
            Err(e) => {
                warn!("Skipping billing file {}: {}", path.display(), e);
                batch.files_failed += 1;
                batch.failures.push(BillingFailure {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        "Loaded {} {} billing rows from {} files",
        batch.records.len(),
        source.provider(),
        batch.files_loaded
    );
    batch
}

/// [`load_all_billing`] with the source chosen by provider.
///
/// Providers without an export format yield an empty batch.
pub fn load_provider_billing(provider: &Provider, root: &Path) -> BillingBatch {
    match provider {
        Provider::Aws => load_all_billing(&AwsBilling, root),
        Provider::Azure => load_all_billing(&AzureBilling, root),
        Provider::Gcp => load_all_billing(&GcpBilling, root),
        Provider::Alibaba => load_all_billing(&AlibabaBilling, root),
        Provider::Other(name) => {
            warn!("No billing format for provider '{}'", name);
            BillingBatch::default()
        }
    }
}

// ── Reconciliation ────────────────────────────────────────────────────────────

/// Outcome of merging one provider's billing rows into the canonical records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub provider: Provider,
    pub billing_records: usize,
    pub duplicates_discarded: usize,
    /// Canonical records belonging to `provider`.
    pub provider_records: usize,
    pub matched: usize,
    /// Records of `provider` still without a billed duration afterwards.
    pub unmatched: usize,
}

/// Merge `billing` into the records of `provider`.
///
/// The first billing row seen for a key wins. Only billing columns present in
/// the row are written; records of other providers are left untouched.
pub fn inject_billing(
    records: &mut [InvocationRecord],
    provider: &Provider,
    billing: &[BillingRecord],
) -> ReconcileReport {
    let mut by_key: HashMap<&str, &BillingOverlay> = HashMap::with_capacity(billing.len());
    let mut duplicates: Vec<&str> = Vec::new();
    for row in billing {
        if by_key.contains_key(row.key.as_str()) {
            duplicates.push(&row.key);
        } else {
            by_key.insert(&row.key, &row.overlay);
        }
    }

    if !duplicates.is_empty() {
        if *provider == Provider::Gcp {
            warn!(
                "Discarded {} duplicate GCP execution ids: {}",
                duplicates.len(),
                duplicates.join(", ")
            );
        } else {
            debug!(
                "Discarded {} duplicate {} billing rows",
                duplicates.len(),
                provider
            );
        }
    }

    let mut provider_records = 0usize;
    let mut matched = 0usize;
    let mut unmatched = 0usize;
    for record in records.iter_mut().filter(|r| r.provider == *provider) {
        provider_records += 1;
        if let Some(overlay) = record.correlation_key().and_then(|k| by_key.get(k)) {
            record.billing.merge_from(overlay);
            matched += 1;
        }
        if record.billing.billed_duration_ms.is_none() {
            unmatched += 1;
        }
    }

    if unmatched > 0 {
        warn!(
            "{} of {} {} records have no billed duration",
            unmatched, provider_records, provider
        );
    }

    ReconcileReport {
        provider: provider.clone(),
        billing_records: by_key.len(),
        duplicates_discarded: duplicates.len(),
        provider_records,
        matched,
        unmatched,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
