//! GCP Cloud Functions billing exports (Cloud Logging entries).
//!
//! The billed duration is only available inside the free-text payload of the
//! "Function execution took N ms" log line.

use std::sync::OnceLock;

use bench_core::models::{BillingOverlay, Provider};
use regex::Regex;
use serde::Deserialize;

use super::{text_cell, BillingSource};

fn execution_took_re() -> &'static Regex {
    static EXECUTION_TOOK_RE: OnceLock<Regex> = OnceLock::new();
    EXECUTION_TOOK_RE.get_or_init(|| {
        Regex::new(r"Function execution took\s+(\d+)\s+ms").expect("valid execution regex")
    })
}

/// Billed milliseconds from a Cloud Logging `textPayload`.
pub fn billed_duration_from_payload(payload: &str) -> Option<f64> {
    execution_took_re()
        .captures(payload)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GcpBillingRow {
    #[serde(rename = "labels.execution_id")]
    pub execution_id: Option<String>,
    #[serde(rename = "textPayload")]
    pub text_payload: Option<String>,
}

pub struct GcpBilling;

impl BillingSource for GcpBilling {
    type Row = GcpBillingRow;
    const KEY_COLUMN: &'static str = "labels.execution_id";

    fn provider(&self) -> Provider {
        Provider::Gcp
    }

    fn join_key(&self, row: &GcpBillingRow) -> Option<String> {
        text_cell(row.execution_id.as_deref())
    }

    /// Rows that are not an execution-time line carry no billing data.
    fn overlay(&self, row: &GcpBillingRow) -> Option<BillingOverlay> {
        let billed = billed_duration_from_payload(row.text_payload.as_deref()?)?;
        Some(BillingOverlay {
            billed_duration_ms: Some(billed),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_billed_duration_from_payload() {
        assert_eq!(
            billed_duration_from_payload("Function execution took 1234 ms, finished with status code: 200"),
            Some(1234.0)
        );
        assert_eq!(billed_duration_from_payload("Function execution started"), None);
    }

    #[test]
    fn test_load_gcp_export_drops_non_billing_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gcp_billed.csv");
        fs::write(
            &path,
            "timestamp,labels.execution_id,textPayload\n\
             2024-05-01,ex-1,\"Function execution took 250 ms, finished with status code: 200\"\n\
             2024-05-01,ex-1,Function execution started\n\
             2024-05-01,,\"Function execution took 10 ms, finished\"\n\
             2024-05-01,ex-2,\"Function execution took 75 ms, finished\"\n",
        )
        .unwrap();

        let records = GcpBilling.load(&path).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["ex-1", "ex-2"]);
        assert_eq!(records[0].overlay.billed_duration_ms, Some(250.0));
        assert_eq!(records[1].overlay.billed_duration_ms, Some(75.0));
    }
}
