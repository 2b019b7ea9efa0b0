use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::affiliate::domain::{BusinessId, PayeeId, PayoutId, RedemptionId};

/// Identifier wrapper for ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerEntryId(pub String);

/// Kind of financial fact a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Earning,
    Payout,
    Fee,
    Adjustment,
    Refund,
}

impl LedgerEntryKind {
    pub const fn label(self) -> &'static str {
        match self {
            LedgerEntryKind::Earning => "earning",
            LedgerEntryKind::Payout => "payout",
            LedgerEntryKind::Fee => "fee",
            LedgerEntryKind::Adjustment => "adjustment",
            LedgerEntryKind::Refund => "refund",
        }
    }
}

/// An immutable, append-only financial fact affecting a payee's balance.
///
/// Entries are never mutated or deleted; corrections are new `adjustment`
/// entries. `running_balance_cents` is an informational snapshot taken at
/// insertion time; reconciliation always replays the entry stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub payee_id: PayeeId,
    pub kind: LedgerEntryKind,
    /// Signed: positive increases the balance, negative decreases it.
    /// `payout`, `fee`, and `refund` are interpreted by magnitude.
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_id: Option<RedemptionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_id: Option<PayoutId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<BusinessId>,
    pub running_balance_cents: i64,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Payout request lifecycle. `pending → processing → completed | failed`;
/// `completed`, `failed`, and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            PayoutStatus::Completed | PayoutStatus::Failed | PayoutStatus::Cancelled
        )
    }
}

/// Settlement rail for a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Paypal,
    Stripe,
    Check,
}

impl PayoutMethod {
    pub const fn label(self) -> &'static str {
        match self {
            PayoutMethod::BankTransfer => "bank_transfer",
            PayoutMethod::Paypal => "paypal",
            PayoutMethod::Stripe => "stripe",
            PayoutMethod::Check => "check",
        }
    }
}

/// A withdrawal instruction against a payee's available balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: PayoutId,
    pub payee_id: PayeeId,
    /// Requested magnitude, always positive; the reservation ledger entry
    /// carries the negated amount.
    pub amount_cents: i64,
    pub currency: String,
    pub status: PayoutStatus,
    pub method: PayoutMethod,
    /// Method-specific details (account references, mailing address, ...).
    pub details: BTreeMap<String, String>,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_fee_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_by: String,
}

/// Derived balance view, recomputed on demand from the entry stream. Never
/// persisted and never cached inside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerBalance {
    pub payee_id: PayeeId,
    pub total_earnings_cents: i64,
    pub total_payouts_cents: i64,
    /// Sum of pending/processing payout requests. Informational: the payout
    /// reservation already lives in the ledger, so this is not subtracted
    /// from the available balance a second time.
    pub pending_payouts_cents: i64,
    pub available_balance_cents: i64,
    pub currency: String,
    pub last_updated: DateTime<Utc>,
}

/// Aggregated payout activity over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutReport {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub request_count: usize,
    pub total_requested_cents: i64,
    pub total_completed_cents: i64,
    pub total_fees_cents: i64,
    pub average_payout_cents: i64,
    pub by_status: BTreeMap<String, PayoutBucket>,
    pub by_method: BTreeMap<String, PayoutBucket>,
}

/// One breakdown row in a payout report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayoutBucket {
    pub count: usize,
    pub amount_cents: i64,
}
