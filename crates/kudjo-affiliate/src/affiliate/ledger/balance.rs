use super::domain::{LedgerEntry, LedgerEntryKind};

/// Totals produced by replaying a payee's full entry stream.
///
/// The fold is a plain sum per kind, so the result is independent of entry
/// order; ordering matters only for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReplayTotals {
    pub(crate) total_earnings_cents: i64,
    pub(crate) total_payouts_cents: i64,
    pub(crate) balance_cents: i64,
}

impl ReplayTotals {
    /// Spendable balance, clamped at zero. The payout reservation entry is
    /// the single source of truth for held funds, so nothing else is
    /// subtracted here.
    pub(crate) fn available_cents(&self) -> i64 {
        self.balance_cents.max(0)
    }
}

pub(crate) fn replay(entries: &[LedgerEntry]) -> ReplayTotals {
    entries.iter().fold(ReplayTotals::default(), apply)
}

fn apply(mut totals: ReplayTotals, entry: &LedgerEntry) -> ReplayTotals {
    match entry.kind {
        LedgerEntryKind::Earning => {
            totals.total_earnings_cents += entry.amount_cents;
            totals.balance_cents += entry.amount_cents;
        }
        LedgerEntryKind::Payout => {
            totals.total_payouts_cents += entry.amount_cents.abs();
            totals.balance_cents -= entry.amount_cents.abs();
        }
        LedgerEntryKind::Fee => {
            // Fees reduce the balance without counting toward payout totals.
            totals.balance_cents -= entry.amount_cents.abs();
        }
        LedgerEntryKind::Adjustment => {
            // Signed: reversals post positive adjustments, corrections may
            // post negative ones.
            totals.balance_cents += entry.amount_cents;
        }
        LedgerEntryKind::Refund => {
            totals.balance_cents -= entry.amount_cents.abs();
        }
    }
    totals
}
