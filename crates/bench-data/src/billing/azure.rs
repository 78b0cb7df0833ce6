//! Azure Functions billing exports (Application Insights request telemetry).

use bench_core::models::{BillingOverlay, Provider};
use serde::Deserialize;

use super::{text_cell, tolerant_number, BillingSource};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AzureBillingRow {
    #[serde(rename = "customDimensions_InvocationId")]
    pub invocation_id: Option<String>,
    pub id: Option<String>,
    pub duration: Option<String>,
}

pub struct AzureBilling;

impl BillingSource for AzureBilling {
    type Row = AzureBillingRow;
    const KEY_COLUMN: &'static str = "customDimensions_InvocationId";

    fn provider(&self) -> Provider {
        Provider::Azure
    }

    fn join_key(&self, row: &AzureBillingRow) -> Option<String> {
        text_cell(row.invocation_id.as_deref())
    }

    fn overlay(&self, row: &AzureBillingRow) -> Option<BillingOverlay> {
        Some(BillingOverlay {
            billed_duration_ms: tolerant_number(row.duration.as_deref()),
            request_id: text_cell(row.id.as_deref()),
            ..Default::default()
        })
    }
}
