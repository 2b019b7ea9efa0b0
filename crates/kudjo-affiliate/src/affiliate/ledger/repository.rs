use chrono::{DateTime, Utc};

use crate::affiliate::domain::{BusinessId, PayeeId, PayoutId, RedemptionId};

use super::domain::{LedgerEntry, PayoutRequest};

/// A payee's full entry stream plus a version token for optimistic
/// concurrency. The version advances on every append for that payee.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub entries: Vec<LedgerEntry>,
    pub version: u64,
}

/// Storage abstraction for ledger entries and payout requests.
///
/// Implementations must make `reserve_payout` atomic: the request and its
/// reservation entry land together iff the payee's ledger version still
/// matches, which closes the balance check-then-reserve race.
pub trait LedgerStore: Send + Sync {
    /// Entries for a payee, newest `transaction_date` first.
    fn ledger_entries(&self, payee: &PayeeId) -> Result<LedgerSnapshot, LedgerStoreError>;

    /// Append one entry. When `expected_version` is given, fail with
    /// `VersionConflict` if the payee's ledger has advanced past it.
    fn append_entry(
        &self,
        expected_version: Option<u64>,
        entry: LedgerEntry,
    ) -> Result<(), LedgerStoreError>;

    /// Atomically insert a pending payout request together with its negative
    /// reservation entry, guarded by the payee's ledger version.
    fn reserve_payout(
        &self,
        expected_version: u64,
        request: PayoutRequest,
        entry: LedgerEntry,
    ) -> Result<(), LedgerStoreError>;

    fn earning_exists(&self, redemption: &RedemptionId) -> Result<bool, LedgerStoreError>;

    fn payout_by_id(&self, id: &PayoutId) -> Result<Option<PayoutRequest>, LedgerStoreError>;

    fn update_payout(&self, request: PayoutRequest) -> Result<(), LedgerStoreError>;

    /// Payout requests, newest first, optionally scoped to one payee.
    fn payout_history(&self, payee: Option<&PayeeId>)
        -> Result<Vec<PayoutRequest>, LedgerStoreError>;

    /// Payout requests whose `requested_at` falls in `[start, end]`.
    fn payouts_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PayoutRequest>, LedgerStoreError>;

    /// Pending or processing requests for a payee.
    fn pending_payouts(&self, payee: &PayeeId) -> Result<Vec<PayoutRequest>, LedgerStoreError>;

    /// Payees holding earning entries that reference the given business.
    fn payees_for_business(&self, business: &BusinessId)
        -> Result<Vec<PayeeId>, LedgerStoreError>;

    /// Display name for payout descriptions; `None` is non-fatal.
    fn payee_display_name(&self, payee: &PayeeId) -> Result<Option<String>, LedgerStoreError>;
}

/// Failure enumeration for ledger storage.
#[derive(Debug, thiserror::Error)]
pub enum LedgerStoreError {
    #[error("ledger version conflict for payee {payee}: expected {expected}, found {found}")]
    VersionConflict {
        payee: String,
        expected: u64,
        found: u64,
    },
    #[error("payout request not found")]
    NotFound,
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
}
