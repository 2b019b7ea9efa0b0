//! Fraud evaluation and payout ledger workflows for the affiliate platform.
//!
//! The two services here are stateless with respect to their own fields: all
//! persistence goes through the `FraudStore` / `LedgerStore` traits so the
//! engines can be exercised against in-memory fakes in tests and wired to a
//! real document store in production.

pub mod domain;
pub mod fraud;
pub mod ledger;
pub mod router;

#[cfg(test)]
mod tests;

pub use domain::{
    BusinessId, BusinessLocation, Coupon, CouponCode, CouponStatus, CustomerInfo, Discount,
    LocationId, PayeeId, PayoutId, RedemptionContext, RedemptionId, RedemptionMethod,
    RedemptionRecord,
};
pub use fraud::{
    FraudCheckResult, FraudConfig, FraudEvaluator, FraudFlag, FraudLogRecord, FraudStore,
    RiskLevel, StoreError,
};
pub use ledger::{
    InfluencerBalance, LedgerConfig, LedgerEntry, LedgerEntryKind, LedgerError, LedgerSnapshot,
    LedgerStore, LedgerStoreError, PayoutLedger, PayoutMethod, PayoutRejection, PayoutReport,
    PayoutRequest, PayoutStatus, SettlementError, SettlementProvider, SettlementReceipt,
    SimulatedGateway,
};
pub use router::{affiliate_router, AffiliateState};
