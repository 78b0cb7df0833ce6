mod bootstrap;

use anyhow::Result;
use bench_core::settings::Settings;
use bench_data::analysis::run_pipeline;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("faas-bench v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Log dir: {}, billing roots: {}",
        settings.log_dir.display(),
        settings.billing_roots().len()
    );

    let selection = settings.cohort_selection();
    let options = settings.filter_options();
    let partial_cohort = settings.provider.is_some()
        || settings.memory.is_some()
        || settings.benchmark.is_some();
    if selection.is_none() && partial_cohort {
        tracing::warn!("Cohort filtering needs --provider, --memory and --benchmark together");
    }

    let report = run_pipeline(
        &settings.log_dir,
        &settings.billing_roots(),
        selection.as_ref().map(|s| (s, &options)),
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
