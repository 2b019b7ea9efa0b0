use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for payees (influencers/creators entitled to earnings).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PayeeId(pub String);

/// Identifier wrapper for businesses running coupon campaigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub String);

/// Unique lookup key for a redeemable coupon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(pub String);

/// Identifier wrapper for a physical redemption location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(pub String);

/// Identifier wrapper for a persisted redemption record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedemptionId(pub String);

/// Identifier wrapper for a payout request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayoutId(pub String);

/// Authoritative lifecycle gate on a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Inactive,
    Expired,
    Revoked,
}

impl CouponStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CouponStatus::Active => "active",
            CouponStatus::Inactive => "inactive",
            CouponStatus::Expired => "expired",
            CouponStatus::Revoked => "revoked",
        }
    }
}

/// Discount attached to a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Discount {
    Percentage {
        pct: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_discount_cents: Option<i64>,
    },
    Fixed {
        amount_cents: i64,
    },
}

/// A redeemable code instance tied to one business, one payee, and one offer.
///
/// The fraud evaluator treats coupons as read-only; usage counters are
/// advanced by the redemption-processing step downstream of an allowed check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: CouponCode,
    pub status: CouponStatus,
    pub business_id: BusinessId,
    pub payee_id: PayeeId,
    pub offer_id: String,
    pub discount: Discount,
    /// Revenue share awarded to the payee, 0-100.
    pub split_pct: u8,
    pub usage_count: u32,
    pub max_uses: u32,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_spend_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// True while the status gate, usage counter, and expiry all permit redemption.
    pub fn redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Active && self.usage_count < self.max_uses && self.expires_at > now
    }
}

/// Channel through which a redemption was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionMethod {
    Pos,
    Online,
    Manual,
}

impl RedemptionMethod {
    pub const fn label(self) -> &'static str {
        match self {
            RedemptionMethod::Pos => "pos",
            RedemptionMethod::Online => "online",
            RedemptionMethod::Manual => "manual",
        }
    }
}

/// Optional customer identifiers attached to a redemption attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Ephemeral input to a fraud evaluation. Constructed per request and
/// discarded afterwards; only the audit log persists a summary of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionContext {
    pub coupon_code: CouponCode,
    pub amount_cents: i64,
    pub business_id: BusinessId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerInfo>,
    pub method: RedemptionMethod,
    pub timestamp: DateTime<Utc>,
}

/// Persisted fact of a past redemption, consumed by velocity and pattern checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub redemption_id: RedemptionId,
    pub coupon_code: CouponCode,
    pub payee_id: PayeeId,
    pub business_id: BusinessId,
    pub amount_cents: i64,
    pub redeemed_at: DateTime<Utc>,
}

/// A physical location registered under a business for POS redemptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessLocation {
    pub location_id: LocationId,
    pub business_id: BusinessId,
    pub label: String,
    pub active: bool,
}
