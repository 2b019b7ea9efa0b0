use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::affiliate::domain::{
    BusinessId, BusinessLocation, Coupon, CouponCode, LocationId, PayeeId, RedemptionRecord,
};

use super::policy::{FraudFlag, RiskLevel};
use super::FraudCheckResult;
use crate::affiliate::domain::RedemptionContext;

/// Read-side storage abstraction consumed by the fraud evaluator.
///
/// Every read failure propagates: the evaluator fails closed rather than
/// falling back to a permissive default.
pub trait FraudStore: Send + Sync {
    fn coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError>;
    fn redemptions_for_coupon_since(
        &self,
        code: &CouponCode,
        since: DateTime<Utc>,
    ) -> Result<Vec<RedemptionRecord>, StoreError>;
    fn redemptions_for_payee_since(
        &self,
        payee: &PayeeId,
        since: DateTime<Utc>,
    ) -> Result<Vec<RedemptionRecord>, StoreError>;
    fn location(
        &self,
        business: &BusinessId,
        location: &LocationId,
    ) -> Result<Option<BusinessLocation>, StoreError>;
    fn is_ip_blacklisted(&self, ip_address: &str) -> Result<bool, StoreError>;
    fn append_fraud_log(&self, record: FraudLogRecord) -> Result<(), StoreError>;
}

/// Infrastructure failure surfaced by the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Immutable audit record appended for blocked or high-risk evaluations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudLogRecord {
    pub coupon_code: CouponCode,
    pub business_id: BusinessId,
    pub amount_cents: i64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub score: u8,
    pub flags: Vec<FraudFlag>,
    pub risk_level: RiskLevel,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl FraudLogRecord {
    pub fn from_check(ctx: &RedemptionContext, result: &FraudCheckResult) -> Self {
        Self {
            coupon_code: ctx.coupon_code.clone(),
            business_id: ctx.business_id.clone(),
            amount_cents: ctx.amount_cents,
            method: ctx.method.label(),
            ip_address: ctx
                .customer
                .as_ref()
                .and_then(|customer| customer.ip_address.clone()),
            score: result.score,
            flags: result.flags.clone(),
            risk_level: result.risk_level,
            blocked: result.blocked,
            reason: result.reason.clone(),
            logged_at: ctx.timestamp,
        }
    }
}
