mod config;
mod policy;
mod repository;
mod signals;

pub use config::FraudConfig;
pub use policy::{FraudFlag, RiskLevel};
pub use repository::{FraudLogRecord, FraudStore, StoreError};

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{Coupon, RedemptionContext, RedemptionMethod};
use signals::SignalHit;

/// Output of a fraud evaluation. A pure computation result with no persisted
/// identity; `reason` is populated only when the redemption is blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudCheckResult {
    pub score: u8,
    pub flags: Vec<FraudFlag>,
    pub risk_level: RiskLevel,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FraudCheckResult {
    /// Definitive invalidity: score pinned to 100, critical, blocked.
    fn definitive(flag: FraudFlag, reason: String) -> Self {
        Self {
            score: 100,
            flags: vec![flag],
            risk_level: RiskLevel::Critical,
            blocked: true,
            reason: Some(reason),
        }
    }

    fn from_hits(hits: Vec<SignalHit>, config: &FraudConfig) -> Self {
        let total: u32 = hits.iter().map(|hit| u32::from(hit.points)).sum();
        let score = total.min(100) as u8;
        let (blocked, reason) = policy::decide_block(score, &hits, config);

        Self {
            score,
            flags: hits.iter().map(|hit| hit.flag).collect(),
            risk_level: RiskLevel::classify(score),
            blocked,
            reason,
        }
    }
}

/// Stateless evaluator scoring proposed redemptions against the signal set.
///
/// Holds no mutable state of its own; all reads go through the injected
/// store, and the coupon is never mutated here.
pub struct FraudEvaluator<S> {
    store: Arc<S>,
    config: FraudConfig,
}

impl<S> FraudEvaluator<S>
where
    S: FraudStore,
{
    pub fn new(store: Arc<S>, config: FraudConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FraudConfig {
        &self.config
    }

    /// Evaluate a proposed redemption and return the risk classification and
    /// block/allow decision. Store failures propagate: an unavailable fraud
    /// check means the redemption cannot be processed.
    pub fn check_redemption(
        &self,
        ctx: &RedemptionContext,
    ) -> Result<FraudCheckResult, StoreError> {
        let Some(coupon) = self.store.coupon_by_code(&ctx.coupon_code)? else {
            return Ok(FraudCheckResult::definitive(
                FraudFlag::InvalidCoupon,
                format!("coupon {} not found", ctx.coupon_code.0),
            ));
        };

        if let Some(result) = gate(&coupon, ctx) {
            return Ok(result);
        }

        let mut hits = Vec::new();
        signals::check_business_match(&coupon, ctx, &self.config, &mut hits);

        let day_ago = ctx.timestamp - Duration::hours(24);
        let coupon_history = self
            .store
            .redemptions_for_coupon_since(&ctx.coupon_code, day_ago)?;
        signals::check_velocity(&coupon_history, ctx, &self.config, &mut hits);

        signals::check_amount(&coupon, ctx, &self.config, &mut hits);

        let payee_history = self
            .store
            .redemptions_for_payee_since(&coupon.payee_id, day_ago)?;
        signals::check_spend_pattern(&payee_history, ctx, &self.config, &mut hits);

        if ctx.method == RedemptionMethod::Pos {
            if let Some(location_id) = &ctx.location_id {
                let location = self.store.location(&ctx.business_id, location_id)?;
                signals::check_location(location.as_ref(), ctx, &self.config, &mut hits);
            }
        }

        if let Some(ip_address) = ctx
            .customer
            .as_ref()
            .and_then(|customer| customer.ip_address.as_deref())
        {
            let blacklisted = self.store.is_ip_blacklisted(ip_address)?;
            signals::check_ip(ip_address, blacklisted, &self.config, &mut hits);
        }

        let result = FraudCheckResult::from_hits(hits, &self.config);
        if result.blocked {
            warn!(
                coupon = %ctx.coupon_code.0,
                score = result.score,
                risk = result.risk_level.label(),
                "redemption blocked"
            );
        }
        Ok(result)
    }

    /// Append an immutable audit record for this evaluation. Callers invoke
    /// this for blocked or high-risk outcomes, and retroactively for flagged
    /// transactions that proceeded via manual override.
    pub fn log_fraud_attempt(
        &self,
        ctx: &RedemptionContext,
        result: &FraudCheckResult,
    ) -> Result<(), StoreError> {
        self.store
            .append_fraud_log(FraudLogRecord::from_check(ctx, result))
    }
}

/// Existence/status gate. Each failure is definitive and short-circuits the
/// probabilistic checks entirely.
fn gate(coupon: &Coupon, ctx: &RedemptionContext) -> Option<FraudCheckResult> {
    if coupon.status != super::domain::CouponStatus::Active {
        return Some(FraudCheckResult::definitive(
            FraudFlag::InactiveCoupon,
            format!(
                "coupon {} is {}",
                coupon.code.0,
                coupon.status.label()
            ),
        ));
    }

    if coupon.expires_at < ctx.timestamp {
        return Some(FraudCheckResult::definitive(
            FraudFlag::ExpiredCoupon,
            format!("coupon {} expired at {}", coupon.code.0, coupon.expires_at),
        ));
    }

    if coupon.usage_count >= coupon.max_uses {
        return Some(FraudCheckResult::definitive(
            FraudFlag::UsageLimitExceeded,
            format!(
                "coupon {} reached its usage limit ({}/{})",
                coupon.code.0, coupon.usage_count, coupon.max_uses
            ),
        ));
    }

    None
}
