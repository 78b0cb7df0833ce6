//! Record parser for benchmark log units.
//!
//! A unit is the content of one `.log` file: a JSON metadata header on the
//! first line followed by one JSON object per invocation. Parsing is lenient.
//! A bad header voids the unit, a bad invocation line only voids that line,
//! and everything that was skipped is reported in [`ParseDiagnostics`].

use bench_core::cpus::{aws_amd_cpu_name, gcp_cpu_name, AWS_AMD_UNKNOWN};
use bench_core::data_processors::{FieldExtractor, TimestampProcessor};
use bench_core::error::{BenchError, Result};
use bench_core::models::{
    BenchmarkMetrics, BenchmarkType, CorrelationId, InvocationRecord, Provider,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Recoverable oddities noticed while decoding a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// The metadata names a provider without a correlation header; records
    /// are kept but cannot be reconciled.
    UnknownProvider { provider: String },
    /// An AWS AMD processor reported a clock outside every known band.
    UnknownAmdFrequency {
        line: usize,
        frequency_mhz: Option<f64>,
    },
}

/// Why an invocation line that was valid JSON could not be turned into a record.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("line {line}: invocation is not a JSON object")]
    NotAnObject { line: usize },
    #[error("line {line}: missing or non-object 'body'")]
    MissingBody { line: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseDiagnostics {
    /// Set when the metadata header could not be used; the unit then has no records.
    pub metadata_error: Option<String>,
    /// Blank or non-JSON invocation lines.
    pub malformed_lines: usize,
    pub line_errors: Vec<String>,
    pub warnings: Vec<ParseWarning>,
}

/// Records decoded from one unit, in line order.
#[derive(Debug, Clone, Default)]
pub struct ParsedUnit {
    pub records: Vec<InvocationRecord>,
    pub diagnostics: ParseDiagnostics,
}

// ── Run metadata ──────────────────────────────────────────────────────────────

/// Fields shared by every invocation of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    pub timestamp: DateTime<Utc>,
    pub provider: Provider,
    pub region: String,
    pub function: String,
    pub memory_size_mb: u32,
    pub parallel_requests: u32,
    pub iterations_per_benchmark: u32,
    pub retries: u32,
}

impl RunMetadata {
    /// Decode the header line of a unit.
    pub fn parse(line: &str) -> Result<Self> {
        let meta: Value = serde_json::from_str(line.trim())?;
        if !meta.is_object() {
            return Err(BenchError::InvalidMetadata(
                "header is not a JSON object".to_string(),
            ));
        }

        let raw_ts = meta
            .get("timestamp")
            .ok_or_else(|| BenchError::InvalidMetadata("missing timestamp".to_string()))?;
        let timestamp = TimestampProcessor::parse(raw_ts)
            .ok_or_else(|| BenchError::TimestampParse(raw_ts.to_string()))?;

        let memory_size_mb = FieldExtractor::u32(&meta, "memorySize").ok_or_else(|| {
            BenchError::InvalidMetadata("missing or non-numeric memorySize".to_string())
        })?;

        Ok(Self {
            timestamp,
            provider: Provider::from_name(&FieldExtractor::string_or(&meta, "provider", "unknown")),
            region: FieldExtractor::string_or(&meta, "region", "unknown"),
            function: FieldExtractor::string_or(&meta, "function", "unknown"),
            memory_size_mb,
            parallel_requests: FieldExtractor::u32(&meta, "parallel-requests").unwrap_or(0),
            iterations_per_benchmark: FieldExtractor::u32(&meta, "iterationsPerBenchmark")
                .unwrap_or(0),
            retries: FieldExtractor::u32(&meta, "retries").unwrap_or(0),
        })
    }
}

// ── Unit parsing ──────────────────────────────────────────────────────────────

/// Parse one log unit into canonical records.
///
/// `source` only labels log messages (usually the file path).
pub fn parse_log_lines<I, S>(lines: I, source: &str) -> ParsedUnit
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut unit = ParsedUnit::default();
    let mut lines = lines.into_iter();

    let Some(header) = lines.next() else {
        return unit;
    };

    let meta = match RunMetadata::parse(header.as_ref()) {
        Ok(meta) => meta,
        Err(e) => {
            warn!("Invalid metadata line in {}: {}", source, e);
            unit.diagnostics.metadata_error = Some(e.to_string());
            return unit;
        }
    };

    if meta.provider.correlation_header().is_none() {
        warn!("Unknown provider '{}' in {}", meta.provider, source);
        unit.diagnostics.warnings.push(ParseWarning::UnknownProvider {
            provider: meta.provider.to_string(),
        });
    }

    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        let trimmed = line.as_ref().trim();
        if trimmed.is_empty() {
            unit.diagnostics.malformed_lines += 1;
            continue;
        }

        let data: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                debug!("Skipping malformed line {} in {}: {}", line_no, source, e);
                unit.diagnostics.malformed_lines += 1;
                continue;
            }
        };

        match parse_invocation(&meta, &data, line_no, &mut unit.diagnostics.warnings) {
            Ok(record) => unit.records.push(record),
            Err(e) => {
                debug!("Error parsing line in {}: {}", source, e);
                unit.diagnostics.line_errors.push(e.to_string());
            }
        }
    }

    unit
}

/// Decode a single invocation object against its run metadata.
pub fn parse_invocation(
    meta: &RunMetadata,
    data: &Value,
    line: usize,
    warnings: &mut Vec<ParseWarning>,
) -> std::result::Result<InvocationRecord, RecordError> {
    if !data.is_object() {
        return Err(RecordError::NotAnObject { line });
    }
    let body = data
        .get("body")
        .filter(|b| b.is_object())
        .ok_or(RecordError::MissingBody { line })?;
    let empty = Value::Null;
    let header = data
        .get("header")
        .filter(|h| h.is_object())
        .unwrap_or(&empty);
    let benchmark = body.get("benchmark").unwrap_or(&empty);

    let cpu_model_number = FieldExtractor::string_or(body, "cpuModel", "unknown");
    let cpu_frequency = FieldExtractor::f64(body, "cpuFrequencyMHz");
    let raw_cpu = FieldExtractor::string_or(body, "cpuType", "unknown");

    let cpu_type = match meta.provider {
        Provider::Gcp => gcp_cpu_name(&cpu_model_number),
        Provider::Aws if raw_cpu.contains("AMD") => match aws_amd_cpu_name(cpu_frequency) {
            Some(name) => name.to_string(),
            None => {
                warn!(
                    "Unknown AMD frequency {:?} MHz on line {}",
                    cpu_frequency, line
                );
                warnings.push(ParseWarning::UnknownAmdFrequency {
                    line,
                    frequency_mhz: cpu_frequency,
                });
                AWS_AMD_UNKNOWN.to_string()
            }
        },
        _ => raw_cpu,
    };

    let correlation_id = meta
        .provider
        .correlation_header()
        .and_then(|name| FieldExtractor::string(header, name))
        .and_then(|id| CorrelationId::for_provider(&meta.provider, id));

    let benchmark_type = BenchmarkType::from_name(&FieldExtractor::string_or(
        benchmark, "type", "unknown",
    ));
    let metrics = benchmark_metrics(&benchmark_type, benchmark);

    Ok(InvocationRecord {
        timestamp: meta.timestamp,
        provider: meta.provider.clone(),
        region: meta.region.clone(),
        function: meta.function.clone(),
        instance_id: FieldExtractor::string_or(body, "instanceId", "unknown"),
        uuid: FieldExtractor::string_or(body, "uuid", "unknown"),
        container_id: FieldExtractor::string_or(body, "containerID", "unknown"),
        correlation_id,
        memory_size_mb: meta.memory_size_mb,
        parallel_requests: meta.parallel_requests,
        iterations_per_benchmark: meta.iterations_per_benchmark,
        retries: meta.retries,
        cpu_type,
        cpu_model_number,
        cpu_frequency,
        cpu_flags: FieldExtractor::string_set(body, "cpuFlags"),
        runtime_ms: FieldExtractor::f64(body, "runtime"),
        user_runtime_ms: FieldExtractor::f64(body, "userRuntime"),
        framework_runtime_ms: FieldExtractor::f64(body, "frameworkRuntime"),
        invocation_count: FieldExtractor::u32(body, "invocationCount"),
        new_container: FieldExtractor::bool(body, "newcontainer"),
        benchmark_type,
        metrics,
        billing: Default::default(),
    })
}

fn benchmark_metrics(kind: &BenchmarkType, benchmark: &Value) -> BenchmarkMetrics {
    let f = |key: &str| FieldExtractor::f64(benchmark, key);
    match kind {
        BenchmarkType::Gemm => BenchmarkMetrics::Gemm {
            matrix_size: FieldExtractor::u64(benchmark, "matrixSize"),
            multiplication_time_ms: f("multiplicationTimeMs"),
        },
        BenchmarkType::AesCtr => BenchmarkMetrics::AesCtr {
            key_size: FieldExtractor::u64(benchmark, "keySize"),
            encrypt_size_mb: f("encryptSizeMB"),
            encrypt_time_ms: f("encryptTimeMs"),
        },
        BenchmarkType::Gzip => BenchmarkMetrics::Gzip {
            compress_size_mb: f("compressSizeMB"),
            compress_time_ms: f("compressTimeMS"),
        },
        BenchmarkType::Sha256 => BenchmarkMetrics::Sha256 {
            hash_size_mb: f("hashSizeMB"),
            hash_time_ms: f("hashTimeMs"),
        },
        BenchmarkType::Json => BenchmarkMetrics::Json {
            json_time_ms: f("jsonTimeMs"),
        },
        BenchmarkType::Other(_) => BenchmarkMetrics::None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(provider: &str) -> String {
        json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "provider": provider,
            "region": "eu-central-1",
            "memorySize": "512",
            "function": "bench-fn",
            "parallel-requests": 10,
            "iterationsPerBenchmark": 3,
        })
        .to_string()
    }

    fn invocation(header: Value, body: Value) -> String {
        json!({ "header": header, "body": body }).to_string()
    }

    fn gemm_body(instance: &str, count: u32) -> Value {
        json!({
            "cpuType": "Intel(R) Xeon(R) CPU @ 2.50GHz",
            "cpuModel": 85,
            "cpuFrequencyMHz": 2500.0,
            "runtime": 812.5,
            "userRuntime": 700,
            "invocationCount": count,
            "instanceId": instance,
            "uuid": format!("{instance}-{count}"),
            "containerID": "c-1",
            "newcontainer": count == 1,
            "cpuFlags": ["avx2", "sse4_2"],
            "benchmark": {"type": "gemm", "matrixSize": 512, "multiplicationTimeMs": 401.25},
        })
    }

    // ── Metadata ─────────────────────────────────────────────────────────

    #[test]
    fn test_metadata_defaults_and_coercion() {
        let meta = RunMetadata::parse(r#"{"timestamp":"2024-05-01T10:00:00Z","memorySize":1024}"#)
            .unwrap();
        assert_eq!(meta.memory_size_mb, 1024);
        assert_eq!(meta.provider, Provider::Other("unknown".to_string()));
        assert_eq!(meta.region, "unknown");
        assert_eq!(meta.function, "unknown");
        assert_eq!(meta.parallel_requests, 0);
        assert_eq!(meta.retries, 0);
    }

    #[test]
    fn test_metadata_provider_lowercased() {
        let meta = RunMetadata::parse(&metadata("AWS")).unwrap();
        assert_eq!(meta.provider, Provider::Aws);
        assert_eq!(meta.memory_size_mb, 512);
        assert_eq!(meta.parallel_requests, 10);
        assert_eq!(meta.iterations_per_benchmark, 3);
    }

    #[test]
    fn test_metadata_missing_memory_rejected() {
        let err = RunMetadata::parse(r#"{"timestamp":"2024-05-01T10:00:00Z"}"#).unwrap_err();
        assert!(matches!(err, BenchError::InvalidMetadata(_)));
    }

    #[test]
    fn test_metadata_bad_timestamp_rejected() {
        let err =
            RunMetadata::parse(r#"{"timestamp":"yesterday","memorySize":128}"#).unwrap_err();
        assert!(matches!(err, BenchError::TimestampParse(_)));
        let err = RunMetadata::parse(r#"{"memorySize":128}"#).unwrap_err();
        assert!(matches!(err, BenchError::InvalidMetadata(_)));
    }

    // ── Unit parsing ─────────────────────────────────────────────────────

    #[test]
    fn test_well_formed_unit_yields_one_record_per_line() {
        let lines = vec![
            metadata("aws"),
            invocation(json!({"aws-request-id": "r1"}), gemm_body("i-1", 1)),
            invocation(json!({"aws-request-id": "r2"}), gemm_body("i-1", 2)),
            invocation(json!({"aws-request-id": "r3"}), gemm_body("i-1", 3)),
        ];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records.len(), 3);
        assert_eq!(unit.diagnostics, ParseDiagnostics::default());

        let first = &unit.records[0];
        assert_eq!(first.correlation_key(), Some("r1"));
        assert_eq!(first.memory_size_mb, 512);
        assert_eq!(first.region, "eu-central-1");
        assert_eq!(first.invocation_count, Some(1));
        assert_eq!(first.new_container, Some(true));
        assert_eq!(first.user_runtime_ms, Some(700.0));
        assert_eq!(first.cpu_model_number, "85");
        assert!(first.cpu_flags.contains("avx2"));
        assert_eq!(first.metric("multiplication_time_ms"), Some(401.25));
        assert_eq!(first.metric("matrix_size"), Some(512.0));
        assert_eq!(first.billing.billed_duration_ms, None);
    }

    #[test]
    fn test_record_count_never_exceeds_lines() {
        let lines = vec![
            metadata("azure"),
            invocation(json!({}), gemm_body("i-1", 1)),
            "".to_string(),
            "{not json".to_string(),
            json!({"header": {}}).to_string(),
            json!([1, 2, 3]).to_string(),
            invocation(json!({}), gemm_body("i-1", 2)),
        ];
        let unit = parse_log_lines(&lines, "test.log");
        assert!(unit.records.len() <= lines.len() - 1);
        assert_eq!(unit.records.len(), 2);
        assert_eq!(unit.diagnostics.malformed_lines, 2);
        assert_eq!(unit.diagnostics.line_errors.len(), 2);
        assert!(unit.diagnostics.line_errors[0].contains("line 5"));
    }

    #[test]
    fn test_bad_metadata_yields_no_records() {
        let lines = vec![
            "not json".to_string(),
            invocation(json!({}), gemm_body("i-1", 1)),
        ];
        let unit = parse_log_lines(&lines, "bad.log");
        assert!(unit.records.is_empty());
        assert!(unit.diagnostics.metadata_error.is_some());
    }

    #[test]
    fn test_empty_unit() {
        let unit = parse_log_lines(Vec::<String>::new(), "empty.log");
        assert!(unit.records.is_empty());
        assert!(unit.diagnostics.metadata_error.is_none());
    }

    #[test]
    fn test_missing_correlation_header_leaves_id_absent() {
        let lines = vec![metadata("gcp"), invocation(json!({}), gemm_body("i-1", 1))];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records[0].correlation_id, None);
    }

    #[test]
    fn test_unknown_provider_warns_and_keeps_records() {
        let lines = vec![
            metadata("ibm"),
            invocation(json!({"aws-request-id": "r1"}), gemm_body("i-1", 1)),
        ];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records.len(), 1);
        assert_eq!(unit.records[0].correlation_id, None);
        assert_eq!(
            unit.diagnostics.warnings,
            vec![ParseWarning::UnknownProvider {
                provider: "ibm".to_string()
            }]
        );
    }

    // ── CPU resolution ───────────────────────────────────────────────────

    #[test]
    fn test_gcp_model_code_mapped() {
        let mut body = gemm_body("i-1", 1);
        body["cpuModel"] = json!("85");
        let lines = vec![
            metadata("gcp"),
            invocation(json!({"function-execution-id": "e1"}), body),
        ];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records[0].cpu_type, "Model 85 (Intel)");
        assert_eq!(unit.records[0].correlation_key(), Some("e1"));
    }

    #[test]
    fn test_gcp_unknown_model_code() {
        let mut body = gemm_body("i-1", 1);
        body["cpuModel"] = json!(42);
        let lines = vec![metadata("gcp"), invocation(json!({}), body)];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records[0].cpu_type, "Model 42 (Unknown)");
    }

    #[test]
    fn test_aws_amd_known_band() {
        let mut body = gemm_body("i-1", 1);
        body["cpuType"] = json!("AMD EPYC");
        body["cpuFrequencyMHz"] = json!(2650);
        let lines = vec![metadata("aws"), invocation(json!({}), body)];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records[0].cpu_type, "AMD EPYC 2.65GHz");
        assert!(unit.diagnostics.warnings.is_empty());
    }

    #[test]
    fn test_aws_amd_unknown_band_warns() {
        let mut body = gemm_body("i-1", 1);
        body["cpuType"] = json!("AMD EPYC");
        body["cpuFrequencyMHz"] = json!(3000);
        let lines = vec![metadata("aws"), invocation(json!({}), body)];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records[0].cpu_type, AWS_AMD_UNKNOWN);
        assert_eq!(
            unit.diagnostics.warnings,
            vec![ParseWarning::UnknownAmdFrequency {
                line: 2,
                frequency_mhz: Some(3000.0)
            }]
        );
    }

    #[test]
    fn test_azure_amd_string_untouched() {
        let mut body = gemm_body("i-1", 1);
        body["cpuType"] = json!("AMD EPYC 7763 64-Core Processor");
        let lines = vec![metadata("azure"), invocation(json!({}), body)];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records[0].cpu_type, "AMD EPYC 7763 64-Core Processor");
    }

    // ── Benchmark payloads ───────────────────────────────────────────────

    #[test]
    fn test_benchmark_payloads_by_type() {
        let cases = [
            (
                json!({"type": "aesCtr", "keySize": 256, "encryptSizeMB": "16", "encryptTimeMs": 90.5}),
                "encrypt_time_ms",
                90.5,
            ),
            (
                json!({"type": "gzip", "compressSizeMB": 8, "compressTimeMS": 55}),
                "compress_time_ms",
                55.0,
            ),
            (
                json!({"type": "sha256", "hashSizeMB": 32, "hashTimeMs": "12.5"}),
                "hash_time_ms",
                12.5,
            ),
            (json!({"type": "json", "jsonTimeMs": 7}), "json_time_ms", 7.0),
        ];
        for (benchmark, field, expected) in cases {
            let mut body = gemm_body("i-1", 1);
            body["benchmark"] = benchmark;
            let lines = vec![metadata("aws"), invocation(json!({}), body)];
            let unit = parse_log_lines(&lines, "test.log");
            assert_eq!(unit.records[0].metric(field), Some(expected), "{field}");
        }
    }

    #[test]
    fn test_unrecognized_benchmark_has_no_payload() {
        let mut body = gemm_body("i-1", 1);
        body["benchmark"] = json!({"type": "fib", "fibTimeMs": 3});
        let lines = vec![metadata("aws"), invocation(json!({}), body)];
        let unit = parse_log_lines(&lines, "test.log");
        let record = &unit.records[0];
        assert_eq!(record.benchmark_type, BenchmarkType::Other("fib".to_string()));
        assert_eq!(record.metrics, BenchmarkMetrics::None);
    }

    #[test]
    fn test_missing_benchmark_is_unknown() {
        let mut body = gemm_body("i-1", 1);
        body.as_object_mut().unwrap().remove("benchmark");
        let lines = vec![metadata("aws"), invocation(json!({}), body)];
        let unit = parse_log_lines(&lines, "test.log");
        assert_eq!(unit.records[0].benchmark_type, BenchmarkType::default());
    }
}
