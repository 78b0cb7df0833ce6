//! CPU identification and normalisation.
//!
//! Providers report the processor backing a function instance in different
//! ways. GCP exposes only a numeric model code, AWS reports one generic string
//! for two different EPYC generations, and every provider decorates its strings
//! with trademark markers and marketing qualifiers. The helpers here turn those
//! into stable labels that can be grouped on.

use regex::Regex;
use std::sync::OnceLock;

// ── GCP model codes ───────────────────────────────────────────────────────────

/// Known GCP `cpuModel` codes and their labels.
pub const GCP_CPU_MODELS: [(&str, &str); 6] = [
    ("1", "Model 1 (AMD)"),
    ("17", "Model 17 (AMD)"),
    ("85", "Model 85 (Intel)"),
    ("106", "Model 106 (Intel)"),
    ("143", "Model 143 (Intel)"),
    ("173", "Model 173 (Intel)"),
];

/// Label for a GCP CPU model code, e.g. `"85"` → `"Model 85 (Intel)"`.
///
/// Unknown codes yield `"Model {code} (Unknown)"`.
pub fn gcp_cpu_name(model: &str) -> String {
    GCP_CPU_MODELS
        .iter()
        .find(|(code, _)| *code == model)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("Model {model} (Unknown)"))
}

// ── AWS AMD disambiguation ────────────────────────────────────────────────────

/// Label used when an AWS AMD frequency matches no known band.
pub const AWS_AMD_UNKNOWN: &str = "AMD EPYC unknown";

/// Inclusive MHz bands separating the AMD parts AWS reports identically.
const AWS_AMD_BANDS: [(f64, f64, &str); 2] = [
    (2640.0, 2660.0, "AMD EPYC 2.65GHz"),
    (2240.0, 2260.0, "AMD EPYC 2.25GHz"),
];

/// Resolve an AWS AMD processor from its reported clock.
///
/// Returns `None` when the frequency is missing or outside every known band;
/// callers fall back to [`AWS_AMD_UNKNOWN`].
pub fn aws_amd_cpu_name(frequency_mhz: Option<f64>) -> Option<&'static str> {
    let mhz = frequency_mhz?;
    AWS_AMD_BANDS
        .iter()
        .find(|(lo, hi, _)| mhz >= *lo && mhz <= *hi)
        .map(|(_, _, name)| *name)
}

// ── Cosmetic normalisation ────────────────────────────────────────────────────

fn cosmetic_re() -> &'static Regex {
    static COSMETIC_RE: OnceLock<Regex> = OnceLock::new();
    COSMETIC_RE.get_or_init(|| {
        Regex::new(r"(?i)\(R\)|\(TM\)|CPU|Processor|(?:\d+\s*[- ]?\s*Core)|Gen\s+\d+|APU|@| T ")
            .expect("valid cpu cleanup regex")
    })
}

/// Normalise a CPU string while preserving its clock frequency.
///
/// Strips trademark markers, the words "CPU"/"Processor"/"APU", core-count
/// and generation qualifiers and `@`, then collapses whitespace.
///
/// # Examples
///
/// ```
/// use bench_core::cpus::clean_cpu_string;
///
/// assert_eq!(clean_cpu_string("Intel(R) Xeon(R) CPU 2.50GHz"), "Intel Xeon 2.50GHz");
/// assert_eq!(clean_cpu_string("AMD EPYC 7763 64-Core Processor"), "AMD EPYC 7763");
/// ```
pub fn clean_cpu_string(cpu_name: &str) -> String {
    let stripped = cosmetic_re().replace_all(cpu_name, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
