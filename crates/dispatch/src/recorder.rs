//! Default [`OutcomeRecorder`]: one structured `tracing` event per settlement.

use events::{DispatchResult, OutcomeRecorder, RequestId, SettlementOutcome};
use tracing::{info, warn};

/// Writes background settlements to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl OutcomeRecorder for TracingRecorder {
    fn record(&self, request_id: RequestId, result: &DispatchResult) {
        match &result.outcome {
            SettlementOutcome::Delivered { status_code } => info!(
                %request_id,
                channel = %result.channel,
                event_status = %result.event_status,
                status_code,
                "Notification delivered"
            ),
            SettlementOutcome::Failed { reason } => warn!(
                %request_id,
                channel = %result.channel,
                event_status = %result.event_status,
                reason = %reason,
                "Notification failed"
            ),
        }
    }
}
