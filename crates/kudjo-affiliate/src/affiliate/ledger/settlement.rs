use std::sync::atomic::{AtomicU64, Ordering};

use super::domain::PayoutRequest;

/// Capability seam for the external act of moving funds. Production wires a
/// real provider adapter; tests inject fixed-outcome fakes.
pub trait SettlementProvider: Send + Sync {
    fn submit(&self, request: &PayoutRequest) -> Result<SettlementReceipt, SettlementError>;
}

/// Successful settlement outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub transaction_id: String,
    pub fee_cents: i64,
}

/// A declined settlement. Not an infrastructure error: the caller compensates
/// with an adjustment entry and the request ends up `failed`.
#[derive(Debug, thiserror::Error)]
#[error("settlement declined: {reason}")]
pub struct SettlementError {
    pub reason: String,
}

/// Deterministic stand-in for a payment gateway: every `failure_cycle`-th
/// submission is declined (default every 10th, matching the ~90% success
/// rate of the rail it simulates) and successful transfers carry a fee in
/// basis points (default 290 = 2.9%).
#[derive(Debug)]
pub struct SimulatedGateway {
    fee_bps: i64,
    failure_cycle: u64,
    submissions: AtomicU64,
}

impl SimulatedGateway {
    pub fn new(fee_bps: i64, failure_cycle: u64) -> Self {
        Self {
            fee_bps,
            failure_cycle,
            submissions: AtomicU64::new(0),
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(290, 10)
    }
}

impl SettlementProvider for SimulatedGateway {
    fn submit(&self, request: &PayoutRequest) -> Result<SettlementReceipt, SettlementError> {
        let sequence = self.submissions.fetch_add(1, Ordering::Relaxed) + 1;
        if self.failure_cycle > 0 && sequence % self.failure_cycle == 0 {
            return Err(SettlementError {
                reason: format!(
                    "provider rejected {} transfer for {}",
                    request.method.label(),
                    request.payee_id.0
                ),
            });
        }

        Ok(SettlementReceipt {
            transaction_id: format!("sim-{sequence:08}"),
            fee_cents: request.amount_cents * self.fee_bps / 10_000,
        })
    }
}
