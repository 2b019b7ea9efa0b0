use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::affiliate::domain::{BusinessId, PayeeId, PayoutId, RedemptionId};

use super::balance;
use super::domain::{
    InfluencerBalance, LedgerEntry, LedgerEntryId, LedgerEntryKind, PayoutBucket, PayoutMethod,
    PayoutReport, PayoutRequest, PayoutStatus,
};
use super::repository::{LedgerStore, LedgerStoreError};
use super::settlement::SettlementProvider;

/// Operating dials for the payout ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub currency: String,
    pub minimum_payout_cents: i64,
    /// Attempts at the versioned check-and-reserve sequence before giving up.
    pub reserve_retry_limit: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            minimum_payout_cents: 2_000,
            reserve_retry_limit: 3,
        }
    }
}

/// Expected business-rule rejections. These are structured results surfaced
/// directly to the caller, never retried and never treated as system faults.
#[derive(Debug, thiserror::Error)]
pub enum PayoutRejection {
    #[error("insufficient balance: available {available_cents} cents, requested {requested_cents}")]
    InsufficientBalance {
        available_cents: i64,
        requested_cents: i64,
    },
    #[error("payout amount {requested_cents} cents is below the {minimum_cents} cent minimum")]
    BelowMinimum {
        minimum_cents: i64,
        requested_cents: i64,
    },
    #[error("earning already recorded for redemption {0}")]
    DuplicateEarning(String),
    #[error("earning amount must be positive")]
    NonPositiveAmount,
    #[error("payout request already {0}")]
    AlreadyProcessed(&'static str),
}

/// Error raised by the payout ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Rejected(#[from] PayoutRejection),
    #[error(transparent)]
    Store(#[from] LedgerStoreError),
}

static ENTRY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PAYOUT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_entry_id() -> LedgerEntryId {
    let id = ENTRY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LedgerEntryId(format!("led-{id:06}"))
}

fn next_payout_id() -> PayoutId {
    let id = PAYOUT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PayoutId(format!("pay-{id:06}"))
}

/// Append-only ledger and payout lifecycle manager.
///
/// Balance is always derived by replaying the entry stream; the running
/// balance stored on each entry is an insertion-time snapshot for debugging
/// and is never trusted for reconciliation.
pub struct PayoutLedger<S, G> {
    store: Arc<S>,
    gateway: Arc<G>,
    config: LedgerConfig,
}

impl<S, G> PayoutLedger<S, G>
where
    S: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>, config: LedgerConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Recompute the payee's balance from the full entry stream.
    pub fn calculate_balance(&self, payee: &PayeeId) -> Result<InfluencerBalance, LedgerError> {
        let snapshot = self.store.ledger_entries(payee)?;
        let totals = balance::replay(&snapshot.entries);

        let pending_payouts_cents = self
            .store
            .pending_payouts(payee)?
            .iter()
            .map(|request| request.amount_cents)
            .sum();

        Ok(InfluencerBalance {
            payee_id: payee.clone(),
            total_earnings_cents: totals.total_earnings_cents,
            total_payouts_cents: totals.total_payouts_cents,
            pending_payouts_cents,
            available_balance_cents: totals.available_cents(),
            currency: self.config.currency.clone(),
            last_updated: Utc::now(),
        })
    }

    /// Post an `earning` entry for a processed redemption. A redemption id
    /// that already produced an earning is rejected rather than double-posted.
    pub fn record_earning(
        &self,
        payee: &PayeeId,
        amount_cents: i64,
        redemption: RedemptionId,
        campaign_id: String,
        business: BusinessId,
        actor: &str,
    ) -> Result<LedgerEntry, LedgerError> {
        if amount_cents <= 0 {
            return Err(PayoutRejection::NonPositiveAmount.into());
        }
        if self.store.earning_exists(&redemption)? {
            return Err(PayoutRejection::DuplicateEarning(redemption.0).into());
        }

        let snapshot = self.store.ledger_entries(payee)?;
        let totals = balance::replay(&snapshot.entries);
        let now = Utc::now();

        let entry = LedgerEntry {
            id: next_entry_id(),
            payee_id: payee.clone(),
            kind: LedgerEntryKind::Earning,
            amount_cents,
            currency: self.config.currency.clone(),
            description: format!("earning for redemption {}", redemption.0),
            redemption_id: Some(redemption),
            payout_id: None,
            campaign_id: Some(campaign_id),
            business_id: Some(business),
            running_balance_cents: totals.balance_cents + amount_cents,
            transaction_date: now,
            created_at: now,
            created_by: actor.to_string(),
        };

        // Blind append: the running-balance snapshot is informational, so a
        // concurrent writer staling it does not affect correctness.
        self.store.append_entry(None, entry.clone())?;
        info!(payee = %payee.0, amount_cents, "earning recorded");
        Ok(entry)
    }

    /// Validate and reserve a payout. The balance check and the insertion of
    /// the pending request plus its negative reservation entry run as one
    /// version-guarded step, retried on contention.
    pub fn create_payout_request(
        &self,
        payee: &PayeeId,
        amount_cents: i64,
        method: PayoutMethod,
        details: BTreeMap<String, String>,
        actor: &str,
    ) -> Result<PayoutRequest, LedgerError> {
        let mut attempts = 0;
        loop {
            let snapshot = self.store.ledger_entries(payee)?;
            let totals = balance::replay(&snapshot.entries);
            let available = totals.available_cents();

            if available < amount_cents {
                return Err(PayoutRejection::InsufficientBalance {
                    available_cents: available,
                    requested_cents: amount_cents,
                }
                .into());
            }
            if amount_cents < self.config.minimum_payout_cents {
                return Err(PayoutRejection::BelowMinimum {
                    minimum_cents: self.config.minimum_payout_cents,
                    requested_cents: amount_cents,
                }
                .into());
            }

            let display_name = self
                .store
                .payee_display_name(payee)?
                .unwrap_or_else(|| "Unknown".to_string());
            let now = Utc::now();
            let payout_id = next_payout_id();

            let request = PayoutRequest {
                id: payout_id.clone(),
                payee_id: payee.clone(),
                amount_cents,
                currency: self.config.currency.clone(),
                status: PayoutStatus::Pending,
                method,
                details: details.clone(),
                requested_at: now,
                processed_at: None,
                completed_at: None,
                failed_at: None,
                external_transaction_id: None,
                processing_fee_cents: None,
                notes: None,
                created_by: actor.to_string(),
            };
            let entry = LedgerEntry {
                id: next_entry_id(),
                payee_id: payee.clone(),
                kind: LedgerEntryKind::Payout,
                amount_cents: -amount_cents,
                currency: self.config.currency.clone(),
                description: format!("payout reservation for {display_name}"),
                redemption_id: None,
                payout_id: Some(payout_id.clone()),
                campaign_id: None,
                business_id: None,
                running_balance_cents: totals.balance_cents - amount_cents,
                transaction_date: now,
                created_at: now,
                created_by: actor.to_string(),
            };

            match self.store.reserve_payout(snapshot.version, request.clone(), entry) {
                Ok(()) => {
                    info!(payee = %payee.0, payout = %payout_id.0, amount_cents, "payout reserved");
                    return Ok(request);
                }
                Err(err @ LedgerStoreError::VersionConflict { .. }) => {
                    // Ledger moved under us; recompute against the new stream.
                    attempts += 1;
                    if attempts >= self.config.reserve_retry_limit {
                        return Err(err.into());
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Drive a pending payout through settlement. A decline is compensated by
    /// a positive adjustment entry restoring the reserved funds; the original
    /// payout entry stays in place for audit.
    pub fn process_payout_request(
        &self,
        payout_id: &PayoutId,
        actor: &str,
    ) -> Result<PayoutRequest, LedgerError> {
        let mut request = self
            .store
            .payout_by_id(payout_id)?
            .ok_or(LedgerStoreError::NotFound)?;

        if request.status != PayoutStatus::Pending {
            return Err(PayoutRejection::AlreadyProcessed(request.status.label()).into());
        }

        let now = Utc::now();
        request.status = PayoutStatus::Processing;
        request.processed_at = Some(now);
        self.store.update_payout(request.clone())?;

        match self.gateway.submit(&request) {
            Ok(receipt) => {
                request.status = PayoutStatus::Completed;
                request.completed_at = Some(Utc::now());
                request.external_transaction_id = Some(receipt.transaction_id.clone());
                request.processing_fee_cents = Some(receipt.fee_cents);
                self.store.update_payout(request.clone())?;

                if receipt.fee_cents > 0 {
                    self.append_follow_up_entry(
                        &request,
                        LedgerEntryKind::Fee,
                        -receipt.fee_cents,
                        format!(
                            "processing fee for payout {} ({})",
                            request.id.0, receipt.transaction_id
                        ),
                        actor,
                    )?;
                }
                info!(payout = %request.id.0, txn = %receipt.transaction_id, "payout completed");
            }
            Err(decline) => {
                request.status = PayoutStatus::Failed;
                request.failed_at = Some(Utc::now());
                request.notes = Some(decline.reason.clone());
                self.store.update_payout(request.clone())?;

                self.append_follow_up_entry(
                    &request,
                    LedgerEntryKind::Adjustment,
                    request.amount_cents,
                    format!("reversal of payout {}: {}", request.id.0, decline.reason),
                    actor,
                )?;
                warn!(payout = %request.id.0, reason = %decline.reason, "payout failed, funds restored");
            }
        }

        Ok(request)
    }

    /// Payout requests newest first, optionally scoped to one payee.
    pub fn payout_history(
        &self,
        payee: Option<&PayeeId>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PayoutRequest>, LedgerError> {
        let requests = self.store.payout_history(payee)?;
        Ok(requests.into_iter().skip(offset).take(limit).collect())
    }

    /// Ledger entries newest first for one payee.
    pub fn ledger_history(
        &self,
        payee: &PayeeId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let snapshot = self.store.ledger_entries(payee)?;
        Ok(snapshot.entries.into_iter().skip(offset).take(limit).collect())
    }

    /// Pure aggregation over payout requests in a date range.
    pub fn payout_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        business: Option<&BusinessId>,
    ) -> Result<PayoutReport, LedgerError> {
        let mut requests = self.store.payouts_between(start, end)?;

        if let Some(business) = business {
            let payees: HashSet<PayeeId> =
                self.store.payees_for_business(business)?.into_iter().collect();
            requests.retain(|request| payees.contains(&request.payee_id));
        }

        let mut by_status: BTreeMap<String, PayoutBucket> = BTreeMap::new();
        let mut by_method: BTreeMap<String, PayoutBucket> = BTreeMap::new();
        let mut total_requested_cents = 0;
        let mut total_completed_cents = 0;
        let mut total_fees_cents = 0;

        for request in &requests {
            total_requested_cents += request.amount_cents;
            if request.status == PayoutStatus::Completed {
                total_completed_cents += request.amount_cents;
                total_fees_cents += request.processing_fee_cents.unwrap_or(0);
            }

            let status_bucket = by_status.entry(request.status.label().to_string()).or_default();
            status_bucket.count += 1;
            status_bucket.amount_cents += request.amount_cents;

            let method_bucket = by_method.entry(request.method.label().to_string()).or_default();
            method_bucket.count += 1;
            method_bucket.amount_cents += request.amount_cents;
        }

        let request_count = requests.len();
        let average_payout_cents = if request_count == 0 {
            0
        } else {
            total_requested_cents / request_count as i64
        };

        Ok(PayoutReport {
            period_start: start,
            period_end: end,
            request_count,
            total_requested_cents,
            total_completed_cents,
            total_fees_cents,
            average_payout_cents,
            by_status,
            by_method,
        })
    }

    fn append_follow_up_entry(
        &self,
        request: &PayoutRequest,
        kind: LedgerEntryKind,
        amount_cents: i64,
        description: String,
        actor: &str,
    ) -> Result<(), LedgerError> {
        let snapshot = self.store.ledger_entries(&request.payee_id)?;
        let totals = balance::replay(&snapshot.entries);
        let now = Utc::now();

        let entry = LedgerEntry {
            id: next_entry_id(),
            payee_id: request.payee_id.clone(),
            kind,
            amount_cents,
            currency: self.config.currency.clone(),
            description,
            redemption_id: None,
            payout_id: Some(request.id.clone()),
            campaign_id: None,
            business_id: None,
            running_balance_cents: totals.balance_cents
                + match kind {
                    LedgerEntryKind::Adjustment => amount_cents,
                    _ => -amount_cents.abs(),
                },
            transaction_date: now,
            created_at: now,
            created_by: actor.to_string(),
        };
        self.store.append_entry(None, entry)?;
        Ok(())
    }
}
