//! Alibaba Function Compute billing exports (SLS request metrics).

use bench_core::models::{BillingOverlay, Provider};
use serde::Deserialize;

use super::{text_cell, tolerant_number, BillingSource};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlibabaBillingRow {
    pub request_id: Option<String>,
    pub duration_ms: Option<String>,
    #[serde(rename = "memoryMB")]
    pub memory_mb: Option<String>,
    #[serde(rename = "memoryUsageMB")]
    pub memory_usage_mb: Option<String>,
    pub cold_start_latency_ms: Option<String>,
    pub runtime_initialization_ms: Option<String>,
    pub invoke_function_latency_ms: Option<String>,
    pub is_cold_start: Option<String>,
}

pub struct AlibabaBilling;

impl BillingSource for AlibabaBilling {
    type Row = AlibabaBillingRow;
    const KEY_COLUMN: &'static str = "requestId";

    fn provider(&self) -> Provider {
        Provider::Alibaba
    }

    fn join_key(&self, row: &AlibabaBillingRow) -> Option<String> {
        text_cell(row.request_id.as_deref())
    }

    fn overlay(&self, row: &AlibabaBillingRow) -> Option<BillingOverlay> {
        Some(BillingOverlay {
            billed_duration_ms: tolerant_number(row.duration_ms.as_deref()),
            memory_mb: tolerant_number(row.memory_mb.as_deref()),
            memory_used_mb: tolerant_number(row.memory_usage_mb.as_deref()),
            cold_start_latency_ms: tolerant_number(row.cold_start_latency_ms.as_deref()),
            runtime_init_ms: tolerant_number(row.runtime_initialization_ms.as_deref()),
            invoke_latency_ms: tolerant_number(row.invoke_function_latency_ms.as_deref()),
            is_cold_start: row
                .is_cold_start
                .as_deref()
                .map(|s| s.trim().eq_ignore_ascii_case("true")),
            ..Default::default()
        })
    }
}
