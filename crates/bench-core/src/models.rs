use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ── Provider ──────────────────────────────────────────────────────────────────

/// Cloud provider a benchmark run was executed on.
///
/// Names that are not one of the four benchmarked providers are preserved
/// verbatim (lower-cased) in [`Provider::Other`] so the record can still be
/// emitted and reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
    Alibaba,
    #[serde(untagged)]
    Other(String),
}

impl Provider {
    /// The four providers with billing exports and pricing rules.
    pub const KNOWN: [Provider; 4] = [
        Provider::Aws,
        Provider::Azure,
        Provider::Gcp,
        Provider::Alibaba,
    ];

    /// Parse a provider name case-insensitively.
    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        match lower.as_str() {
            "aws" => Provider::Aws,
            "azure" => Provider::Azure,
            "gcp" => Provider::Gcp,
            "alibaba" => Provider::Alibaba,
            _ => Provider::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
            Provider::Alibaba => "alibaba",
            Provider::Other(name) => name,
        }
    }

    /// Name of the transport header carrying this provider's invocation id.
    pub fn correlation_header(&self) -> Option<&'static str> {
        match self {
            Provider::Aws => Some("aws-request-id"),
            Provider::Azure => Some("azure-invocation-id"),
            Provider::Gcp => Some("function-execution-id"),
            Provider::Alibaba => Some("ali-request-id"),
            Provider::Other(_) => None,
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Provider::Other("unknown".to_string())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── CorrelationId ─────────────────────────────────────────────────────────────

/// Provider-specific invocation id used to join a record with its billing row.
///
/// Serialises as a single column named after the provider, e.g.
/// `{"aws_request_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationId {
    AwsRequestId(String),
    AzureInvocationId(String),
    GcpExecutionId(String),
    AlibabaRequestId(String),
}

impl CorrelationId {
    /// Wrap `id` in the variant belonging to `provider`.
    ///
    /// Returns `None` for providers without a correlation column.
    pub fn for_provider(provider: &Provider, id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        match provider {
            Provider::Aws => Some(CorrelationId::AwsRequestId(id)),
            Provider::Azure => Some(CorrelationId::AzureInvocationId(id)),
            Provider::Gcp => Some(CorrelationId::GcpExecutionId(id)),
            Provider::Alibaba => Some(CorrelationId::AlibabaRequestId(id)),
            Provider::Other(_) => None,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            CorrelationId::AwsRequestId(id)
            | CorrelationId::AzureInvocationId(id)
            | CorrelationId::GcpExecutionId(id)
            | CorrelationId::AlibabaRequestId(id) => id,
        }
    }

}

// ── Benchmarks ────────────────────────────────────────────────────────────────

/// Kind of micro-benchmark executed by an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BenchmarkType {
    #[serde(rename = "gemm")]
    Gemm,
    #[serde(rename = "aesCtr")]
    AesCtr,
    #[serde(rename = "gzip")]
    Gzip,
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "json")]
    Json,
    #[serde(untagged)]
    Other(String),
}

impl BenchmarkType {
    /// Parse a benchmark name exactly as written by the harness.
    pub fn from_name(name: &str) -> Self {
        match name {
            "gemm" => BenchmarkType::Gemm,
            "aesCtr" => BenchmarkType::AesCtr,
            "gzip" => BenchmarkType::Gzip,
            "sha256" => BenchmarkType::Sha256,
            "json" => BenchmarkType::Json,
            other => BenchmarkType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BenchmarkType::Gemm => "gemm",
            BenchmarkType::AesCtr => "aesCtr",
            BenchmarkType::Gzip => "gzip",
            BenchmarkType::Sha256 => "sha256",
            BenchmarkType::Json => "json",
            BenchmarkType::Other(name) => name,
        }
    }

    /// Primary performance column for this benchmark.
    pub fn metric_field(&self) -> &'static str {
        match self {
            BenchmarkType::Gemm => "multiplication_time_ms",
            BenchmarkType::AesCtr => "encrypt_time_ms",
            BenchmarkType::Gzip => "compress_time_ms",
            BenchmarkType::Sha256 => "hash_time_ms",
            BenchmarkType::Json => "json_time_ms",
            BenchmarkType::Other(_) => "runtime_ms",
        }
    }
}

impl Default for BenchmarkType {
    fn default() -> Self {
        BenchmarkType::Other("unknown".to_string())
    }
}

impl fmt::Display for BenchmarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return the metric column analysed for `benchmark` (`runtime_ms` when the
/// benchmark is not recognised).
pub fn metric_for_benchmark(benchmark: &str) -> &'static str {
    BenchmarkType::from_name(benchmark).metric_field()
}

/// Benchmark-specific measurements, one variant per [`BenchmarkType`].
///
/// Flattened into the record when serialised, so only the columns of the
/// executed benchmark appear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BenchmarkMetrics {
    Gemm {
        matrix_size: Option<u64>,
        multiplication_time_ms: Option<f64>,
    },
    AesCtr {
        key_size: Option<u64>,
        encrypt_size_mb: Option<f64>,
        encrypt_time_ms: Option<f64>,
    },
    Gzip {
        compress_size_mb: Option<f64>,
        compress_time_ms: Option<f64>,
    },
    Sha256 {
        hash_size_mb: Option<f64>,
        hash_time_ms: Option<f64>,
    },
    Json {
        json_time_ms: Option<f64>,
    },
    #[default]
    None,
}

impl BenchmarkMetrics {
    /// Look up a benchmark column by name.
    pub fn get(&self, field: &str) -> Option<f64> {
        match (self, field) {
            (BenchmarkMetrics::Gemm { matrix_size, .. }, "matrix_size") => {
                matrix_size.map(|v| v as f64)
            }
            (
                BenchmarkMetrics::Gemm {
                    multiplication_time_ms,
                    ..
                },
                "multiplication_time_ms",
            ) => *multiplication_time_ms,
            (BenchmarkMetrics::AesCtr { key_size, .. }, "key_size") => key_size.map(|v| v as f64),
            (BenchmarkMetrics::AesCtr { encrypt_size_mb, .. }, "encrypt_size_mb") => {
                *encrypt_size_mb
            }
            (BenchmarkMetrics::AesCtr { encrypt_time_ms, .. }, "encrypt_time_ms") => {
                *encrypt_time_ms
            }
            (BenchmarkMetrics::Gzip { compress_size_mb, .. }, "compress_size_mb") => {
                *compress_size_mb
            }
            (BenchmarkMetrics::Gzip { compress_time_ms, .. }, "compress_time_ms") => {
                *compress_time_ms
            }
            (BenchmarkMetrics::Sha256 { hash_size_mb, .. }, "hash_size_mb") => *hash_size_mb,
            (BenchmarkMetrics::Sha256 { hash_time_ms, .. }, "hash_time_ms") => *hash_time_ms,
            (BenchmarkMetrics::Json { json_time_ms }, "json_time_ms") => *json_time_ms,
            _ => None,
        }
    }
}

// ── Billing ───────────────────────────────────────────────────────────────────

/// Billing columns merged into a record after reconciliation.
///
/// The union of every provider's export; a given provider only fills the
/// columns its export carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingOverlay {
    /// Duration the provider charged for.
    pub billed_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_used_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cold_start_latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_init_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cold_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl BillingOverlay {
    /// Copy every column present in `other` into `self`.
    pub fn merge_from(&mut self, other: &BillingOverlay) {
        fill(&mut self.billed_duration_ms, &other.billed_duration_ms);
        fill(&mut self.duration_ms, &other.duration_ms);
        fill(&mut self.memory_mb, &other.memory_mb);
        fill(&mut self.max_memory_used_mb, &other.max_memory_used_mb);
        fill(&mut self.init_duration_ms, &other.init_duration_ms);
        fill(&mut self.memory_used_mb, &other.memory_used_mb);
        fill(&mut self.cold_start_latency_ms, &other.cold_start_latency_ms);
        fill(&mut self.runtime_init_ms, &other.runtime_init_ms);
        fill(&mut self.invoke_latency_ms, &other.invoke_latency_ms);
        fill(&mut self.is_cold_start, &other.is_cold_start);
        fill(&mut self.request_id, &other.request_id);
    }

    /// Look up a numeric billing column by name.
    pub fn get(&self, field: &str) -> Option<f64> {
        match field {
            "billed_duration_ms" => self.billed_duration_ms,
            "duration_ms" => self.duration_ms,
            "memory_mb" => self.memory_mb,
            "max_memory_used_mb" => self.max_memory_used_mb,
            "init_duration_ms" => self.init_duration_ms,
            "memory_used_mb" => self.memory_used_mb,
            "cold_start_latency_ms" => self.cold_start_latency_ms,
            "runtime_init_ms" => self.runtime_init_ms,
            "invoke_latency_ms" => self.invoke_latency_ms,
            _ => None,
        }
    }
}

fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if let Some(value) = src {
        *dst = Some(value.clone());
    }
}

/// One normalised row of a provider billing export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Provider-specific invocation id this row joins on.
    pub key: String,
    #[serde(flatten)]
    pub overlay: BillingOverlay,
}

// ── InvocationRecord ──────────────────────────────────────────────────────────

/// A single function invocation in canonical form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvocationRecord {
    /// Start of the benchmark run this invocation belongs to (UTC).
    pub timestamp: DateTime<Utc>,
    pub provider: Provider,
    pub region: String,
    pub function: String,
    /// Execution environment instance; one cohort per instance.
    pub instance_id: String,
    pub uuid: String,
    pub container_id: String,
    #[serde(flatten)]
    pub correlation_id: Option<CorrelationId>,

    pub memory_size_mb: u32,
    pub parallel_requests: u32,
    pub iterations_per_benchmark: u32,
    pub retries: u32,

    pub cpu_type: String,
    pub cpu_model_number: String,
    /// Reported CPU clock in MHz.
    pub cpu_frequency: Option<f64>,
    pub cpu_flags: BTreeSet<String>,

    pub runtime_ms: Option<f64>,
    pub user_runtime_ms: Option<f64>,
    pub framework_runtime_ms: Option<f64>,
    /// 1-based position within the instance; `1` is the cold start.
    pub invocation_count: Option<u32>,
    pub new_container: Option<bool>,

    pub benchmark_type: BenchmarkType,
    #[serde(flatten)]
    pub metrics: BenchmarkMetrics,

    #[serde(flatten)]
    pub billing: BillingOverlay,
}

impl InvocationRecord {
    /// The join key used for billing reconciliation, if one was recorded.
    pub fn correlation_key(&self) -> Option<&str> {
        self.correlation_id.as_ref().map(CorrelationId::value)
    }

    /// True only for invocations known to have reused a live instance.
    ///
    /// Rows without an invocation count are not considered warm.
    pub fn is_warm_start(&self) -> bool {
        self.invocation_count.map_or(false, |n| n > 1)
    }

    /// Resolve a numeric column by name across runtime, benchmark and billing
    /// fields.
    pub fn metric(&self, field: &str) -> Option<f64> {
        match field {
            "runtime_ms" => self.runtime_ms,
            "user_runtime_ms" => self.user_runtime_ms,
            "framework_runtime_ms" => self.framework_runtime_ms,
            "cpu_frequency" => self.cpu_frequency,
            _ => self
                .metrics
                .get(field)
                .or_else(|| self.billing.get(field)),
        }
    }

    /// Per-invocation cost from the billed duration, falling back to the
    /// measured runtime. `None` when neither duration is known.
    pub fn invocation_cost(&self) -> Option<f64> {
        let duration = self.billing.billed_duration_ms.or(self.runtime_ms)?;
        Some(crate::pricing::calculate_cost(
            &self.provider,
            self.memory_size_mb,
            duration,
        ))
    }
}

// ── Cohort selection ──────────────────────────────────────────────────────────

/// Identifies one comparison cohort: provider, memory size, benchmark and
/// optionally region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortSelection {
    pub provider: Provider,
    pub memory_size_mb: u32,
    pub benchmark: BenchmarkType,
    #[serde(default)]
    pub region: Option<String>,
}

impl CohortSelection {
    pub fn new(provider: Provider, memory_size_mb: u32, benchmark: BenchmarkType) -> Self {
        Self {
            provider,
            memory_size_mb,
            benchmark,
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn matches(&self, record: &InvocationRecord) -> bool {
        record.provider == self.provider
            && record.memory_size_mb == self.memory_size_mb
            && record.benchmark_type == self.benchmark
            && self
                .region
                .as_ref()
                .map_or(true, |region| &record.region == region)
    }
}

/// Number of invocations each instance runs: one cold start plus three warm.
pub const INVOCATIONS_PER_INSTANCE: usize = 4;

/// Tuning knobs for the cohort filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Also separate instance groups by run timestamp.
    pub group_on_timestamp: bool,
    /// Drop the cold-start invocation of every instance.
    pub remove_cold: bool,
    /// Skip percentile-based outlier removal.
    pub no_outlier_filter: bool,
    /// Lower quantile of the accepted band, in `[0, 1]`.
    pub lower_quantile: f64,
    /// Upper quantile of the accepted band, in `[0, 1]`.
    pub upper_quantile: f64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            group_on_timestamp: false,
            remove_cold: true,
            no_outlier_filter: false,
            lower_quantile: 0.05,
            upper_quantile: 0.95,
        }
    }
}
