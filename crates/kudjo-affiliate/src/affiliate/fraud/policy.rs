use serde::{Deserialize, Serialize};

use super::signals::SignalHit;
use super::FraudConfig;

/// Named identifier for a triggered fraud signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FraudFlag {
    InvalidCoupon,
    InactiveCoupon,
    ExpiredCoupon,
    UsageLimitExceeded,
    BusinessMismatch,
    HighVelocity,
    HourlyLimitExceeded,
    DailyLimitExceeded,
    HighAmount,
    BelowMinSpend,
    RoundAmount,
    DailyAmountExceeded,
    RepeatedAmounts,
    InvalidLocation,
    InactiveLocation,
    BlacklistedIp,
    VpnProxy,
}

impl FraudFlag {
    pub const fn label(self) -> &'static str {
        match self {
            FraudFlag::InvalidCoupon => "INVALID_COUPON",
            FraudFlag::InactiveCoupon => "INACTIVE_COUPON",
            FraudFlag::ExpiredCoupon => "EXPIRED_COUPON",
            FraudFlag::UsageLimitExceeded => "USAGE_LIMIT_EXCEEDED",
            FraudFlag::BusinessMismatch => "BUSINESS_MISMATCH",
            FraudFlag::HighVelocity => "HIGH_VELOCITY",
            FraudFlag::HourlyLimitExceeded => "HOURLY_LIMIT_EXCEEDED",
            FraudFlag::DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            FraudFlag::HighAmount => "HIGH_AMOUNT",
            FraudFlag::BelowMinSpend => "BELOW_MIN_SPEND",
            FraudFlag::RoundAmount => "ROUND_AMOUNT",
            FraudFlag::DailyAmountExceeded => "DAILY_AMOUNT_EXCEEDED",
            FraudFlag::RepeatedAmounts => "REPEATED_AMOUNTS",
            FraudFlag::InvalidLocation => "INVALID_LOCATION",
            FraudFlag::InactiveLocation => "INACTIVE_LOCATION",
            FraudFlag::BlacklistedIp => "BLACKLISTED_IP",
            FraudFlag::VpnProxy => "VPN_PROXY",
        }
    }

    /// Flags representing definitive invalidity rather than probabilistic
    /// risk. Any of these forces a block regardless of the numeric score.
    pub const fn is_critical(self) -> bool {
        matches!(
            self,
            FraudFlag::InvalidCoupon
                | FraudFlag::InactiveCoupon
                | FraudFlag::ExpiredCoupon
                | FraudFlag::UsageLimitExceeded
                | FraudFlag::BlacklistedIp
        )
    }
}

/// Categorical bucket derived from the numeric suspicion score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn classify(score: u8) -> Self {
        if score >= 80 {
            RiskLevel::Critical
        } else if score >= 60 {
            RiskLevel::High
        } else if score >= 30 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Two-tier blocking decision: categorical blockers first, then the numeric
/// threshold. Returns the human reason only when blocking.
pub(crate) fn decide_block(
    score: u8,
    hits: &[SignalHit],
    config: &FraudConfig,
) -> (bool, Option<String>) {
    if let Some(hit) = hits.iter().find(|hit| hit.flag.is_critical()) {
        return (true, Some(hit.note.clone()));
    }

    if score >= config.block_threshold {
        return (
            true,
            Some(format!(
                "suspicion score {score} at or above block threshold {}",
                config.block_threshold
            )),
        );
    }

    (false, None)
}
