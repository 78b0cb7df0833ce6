//! AWS Lambda billing exports (CloudWatch Logs Insights `REPORT` lines).

use bench_core::models::{BillingOverlay, Provider};
use serde::Deserialize;

use super::{text_cell, tolerant_number, BillingSource};

/// Memory columns are exported in bytes.
const BYTES_PER_MB: f64 = 1_000_000.0;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AwsBillingRow {
    #[serde(rename = "@requestId")]
    pub request_id: Option<String>,
    #[serde(rename = "@duration")]
    pub duration: Option<String>,
    #[serde(rename = "@billedDuration")]
    pub billed_duration: Option<String>,
    #[serde(rename = "@memorySize")]
    pub memory_size: Option<String>,
    #[serde(rename = "@maxMemoryUsed")]
    pub max_memory_used: Option<String>,
    #[serde(rename = "@initDuration")]
    pub init_duration: Option<String>,
}

pub struct AwsBilling;

impl BillingSource for AwsBilling {
    type Row = AwsBillingRow;
    const KEY_COLUMN: &'static str = "@requestId";

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn join_key(&self, row: &AwsBillingRow) -> Option<String> {
        text_cell(row.request_id.as_deref())
    }

    fn overlay(&self, row: &AwsBillingRow) -> Option<BillingOverlay> {
        Some(BillingOverlay {
            billed_duration_ms: tolerant_number(row.billed_duration.as_deref()),
            duration_ms: tolerant_number(row.duration.as_deref()),
            memory_mb: tolerant_number(row.memory_size.as_deref()).map(|b| b / BYTES_PER_MB),
            max_memory_used_mb: tolerant_number(row.max_memory_used.as_deref())
                .map(|b| b / BYTES_PER_MB),
            init_duration_ms: tolerant_number(row.init_duration.as_deref()),
            ..Default::default()
        })
    }
}
