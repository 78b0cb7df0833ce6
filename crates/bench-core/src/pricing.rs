//! Per-invocation cost model for the four benchmarked providers.
//!
//! Every function here is pure: the same provider, memory size and duration
//! always yield the same amount (US dollars).

use crate::models::Provider;

// ── Pricing constants ─────────────────────────────────────────────────────────

/// AWS Lambda: $0.20 per million requests.
pub const AWS_REQUEST_PRICE: f64 = 0.20 / 1_000_000.0;
/// AWS Lambda: price per GB-second.
pub const AWS_GB_SECOND_PRICE: f64 = 0.000_016_666_7;

/// Azure Functions: $0.20 per million requests.
pub const AZURE_REQUEST_PRICE: f64 = 0.20 / 1_000_000.0;
/// Azure Functions: price per GB-second.
pub const AZURE_GB_SECOND_PRICE: f64 = 0.000_037;

/// GCP Cloud Functions (1st gen): $0.40 per million requests.
pub const GCP_REQUEST_PRICE: f64 = 0.40 / 1_000_000.0;
/// GCP bills compute in 100 ms units, rounded up.
pub const GCP_BILLING_UNIT_MS: f64 = 100.0;
/// Tier-1 price per 100 ms unit, keyed by memory size in MB.
const GCP_TIER1_PER_100MS: [(u32, f64); 7] = [
    (128, 0.000_000_231),
    (256, 0.000_000_463),
    (512, 0.000_000_925),
    (1024, 0.000_001_650),
    (2048, 0.000_002_900),
    (4096, 0.000_005_800),
    (8192, 0.000_006_800),
];
/// Per-GB price per 100 ms unit for memory sizes outside the tier table.
const GCP_FALLBACK_PER_GB_100MS: f64 = 0.000_001_4;

/// Alibaba Function Compute: price per compute unit.
pub const ALIBABA_CU_PRICE: f64 = 0.000_020;
/// Alibaba charges 75 CU per 10,000 requests.
pub const ALIBABA_REQUEST_CU: f64 = 0.0075;
/// Memory-weighted share of a compute unit, per GB.
const ALIBABA_MEMORY_CU_PER_GB: f64 = 0.15;
/// vCPU allocation by memory size in MB.
const ALIBABA_VCPU_BY_MEMORY: [(u32, f64); 3] = [(128, 0.1), (512, 0.4), (2048, 1.6)];
/// vCPUs per GB for memory sizes outside the allocation table.
const ALIBABA_FALLBACK_VCPU_PER_GB: f64 = 0.75;

// ── Lookups ───────────────────────────────────────────────────────────────────

fn lookup(table: &[(u32, f64)], memory_mb: u32) -> Option<f64> {
    table
        .iter()
        .find(|(mb, _)| *mb == memory_mb)
        .map(|(_, value)| *value)
}

/// GCP price of one 100 ms unit at `memory_mb`.
pub fn gcp_unit_price(memory_mb: u32) -> f64 {
    lookup(&GCP_TIER1_PER_100MS, memory_mb)
        .unwrap_or_else(|| (memory_mb as f64 / 1024.0) * GCP_FALLBACK_PER_GB_100MS)
}

/// vCPUs Alibaba allocates to a function with `memory_mb` of memory.
pub fn alibaba_vcpu(memory_mb: u32) -> f64 {
    lookup(&ALIBABA_VCPU_BY_MEMORY, memory_mb)
        .unwrap_or_else(|| (memory_mb as f64 / 1024.0) * ALIBABA_FALLBACK_VCPU_PER_GB)
}

// ── Cost model ────────────────────────────────────────────────────────────────

fn gb_second_cost(memory_mb: u32, duration_ms: f64, gb_second_price: f64, request: f64) -> f64 {
    let duration_sec = duration_ms / 1000.0;
    let memory_gb = memory_mb as f64 / 1024.0;
    duration_sec * memory_gb * gb_second_price + request
}

fn gcp_cost(memory_mb: u32, duration_ms: f64) -> f64 {
    let billed_units = (duration_ms / GCP_BILLING_UNIT_MS).ceil();
    billed_units * gcp_unit_price(memory_mb) + GCP_REQUEST_PRICE
}

fn alibaba_cost(memory_mb: u32, duration_ms: f64) -> f64 {
    let duration_sec = duration_ms / 1000.0;
    let memory_gb = memory_mb as f64 / 1024.0;
    let compute_units = alibaba_vcpu(memory_mb) + memory_gb * ALIBABA_MEMORY_CU_PER_GB;
    let compute_cost = compute_units * duration_sec * ALIBABA_CU_PRICE;
    let request_cost = ALIBABA_REQUEST_CU * ALIBABA_CU_PRICE;
    compute_cost + request_cost
}

/// Cost in USD of a single invocation.
///
/// `duration_ms` is the raw execution time; provider rounding rules are
/// applied here. Providers without a pricing model cost `0.0`.
pub fn calculate_cost(provider: &Provider, memory_mb: u32, duration_ms: f64) -> f64 {
    match provider {
        Provider::Aws => gb_second_cost(
            memory_mb,
            duration_ms,
            AWS_GB_SECOND_PRICE,
            AWS_REQUEST_PRICE,
        ),
        Provider::Azure => gb_second_cost(
            memory_mb,
            duration_ms,
            AZURE_GB_SECOND_PRICE,
            AZURE_REQUEST_PRICE,
        ),
        Provider::Gcp => gcp_cost(memory_mb, duration_ms),
        Provider::Alibaba => alibaba_cost(memory_mb, duration_ms),
        Provider::Other(_) => 0.0,
    }
}

/// [`calculate_cost`] keyed by a provider name (case-insensitive).
pub fn calculate_cost_by_name(provider: &str, memory_mb: u32, duration_ms: f64) -> f64 {
    calculate_cost(&Provider::from_name(provider), memory_mb, duration_ms)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
