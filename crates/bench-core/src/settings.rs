use clap::Parser;
use std::path::PathBuf;

use crate::models::{BenchmarkType, CohortSelection, FilterOptions, Provider};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Normalize, reconcile and filter serverless benchmark telemetry
#[derive(Parser, Debug, Clone)]
#[command(
    name = "faas-bench",
    about = "Normalize, reconcile and filter serverless benchmark telemetry",
    version
)]
pub struct Settings {
    /// Root directory scanned for benchmark `.log` files
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Root directory of AWS billing exports
    #[arg(long)]
    pub aws_billing: Option<PathBuf>,

    /// Root directory of Azure billing exports
    #[arg(long)]
    pub azure_billing: Option<PathBuf>,

    /// Root directory of GCP billing exports
    #[arg(long)]
    pub gcp_billing: Option<PathBuf>,

    /// Root directory of Alibaba billing exports
    #[arg(long)]
    pub alibaba_billing: Option<PathBuf>,

    /// Provider of the cohort to filter
    #[arg(long, value_parser = ["aws", "azure", "gcp", "alibaba"])]
    pub provider: Option<String>,

    /// Memory size (MB) of the cohort to filter
    #[arg(long)]
    pub memory: Option<u32>,

    /// Benchmark of the cohort to filter
    #[arg(long)]
    pub benchmark: Option<String>,

    /// Restrict the cohort to one region
    #[arg(long)]
    pub region: Option<String>,

    /// Keep runs with different timestamps in separate outlier groups
    #[arg(long)]
    pub group_on_timestamp: bool,

    /// Keep cold-start invocations
    #[arg(long)]
    pub keep_cold: bool,

    /// Disable percentile outlier removal
    #[arg(long)]
    pub no_outlier_filter: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Billing export roots that were configured, per provider.
    pub fn billing_roots(&self) -> Vec<(Provider, PathBuf)> {
        [
            (Provider::Aws, &self.aws_billing),
            (Provider::Azure, &self.azure_billing),
            (Provider::Gcp, &self.gcp_billing),
            (Provider::Alibaba, &self.alibaba_billing),
        ]
        .into_iter()
        .filter_map(|(provider, root)| root.clone().map(|path| (provider, path)))
        .collect()
    }

    /// The cohort to filter, when provider, memory and benchmark are all set.
    pub fn cohort_selection(&self) -> Option<CohortSelection> {
        let provider = Provider::from_name(self.provider.as_deref()?);
        let benchmark = BenchmarkType::from_name(self.benchmark.as_deref()?);
        let selection = CohortSelection::new(provider, self.memory?, benchmark);
        Some(match &self.region {
            Some(region) => selection.with_region(region.clone()),
            None => selection,
        })
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            group_on_timestamp: self.group_on_timestamp,
            remove_cold: !self.keep_cold,
            no_outlier_filter: self.no_outlier_filter,
            ..FilterOptions::default()
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["faas-bench"]);

        assert_eq!(settings.log_dir, PathBuf::from("."));
        assert!(settings.aws_billing.is_none());
        assert!(settings.provider.is_none());
        assert!(settings.memory.is_none());
        assert!(!settings.group_on_timestamp);
        assert!(!settings.keep_cold);
        assert!(!settings.no_outlier_filter);
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_debug_overrides_log_level() {
        let settings = Settings::load_from_args(["faas-bench", "--debug"]);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_settings_rejects_unknown_provider() {
        let result = Settings::try_parse_from(["faas-bench", "--provider", "ibm"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_billing_roots_only_configured() {
        let settings = Settings::parse_from([
            "faas-bench",
            "--aws-billing",
            "/data/aws",
            "--gcp-billing",
            "/data/gcp",
        ]);
        let roots = settings.billing_roots();
        assert_eq!(
            roots,
            vec![
                (Provider::Aws, PathBuf::from("/data/aws")),
                (Provider::Gcp, PathBuf::from("/data/gcp")),
            ]
        );
    }

    #[test]
    fn test_cohort_selection_requires_all_parts() {
        let partial = Settings::parse_from(["faas-bench", "--provider", "aws", "--memory", "512"]);
        assert!(partial.cohort_selection().is_none());

        let full = Settings::parse_from([
            "faas-bench",
            "--provider",
            "gcp",
            "--memory",
            "256",
            "--benchmark",
            "sha256",
            "--region",
            "europe-west1",
        ]);
        let selection = full.cohort_selection().unwrap();
        assert_eq!(selection.provider, Provider::Gcp);
        assert_eq!(selection.memory_size_mb, 256);
        assert_eq!(selection.benchmark, BenchmarkType::Sha256);
        assert_eq!(selection.region.as_deref(), Some("europe-west1"));
    }

    #[test]
    fn test_filter_options_from_flags() {
        let settings = Settings::parse_from([
            "faas-bench",
            "--keep-cold",
            "--no-outlier-filter",
            "--group-on-timestamp",
        ]);
        let opts = settings.filter_options();
        assert!(!opts.remove_cold);
        assert!(opts.no_outlier_filter);
        assert!(opts.group_on_timestamp);
        assert!((opts.upper_quantile - 0.95).abs() < f64::EPSILON);
    }
}
