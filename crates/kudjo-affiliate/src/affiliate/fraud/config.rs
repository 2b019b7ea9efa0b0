use serde::{Deserialize, Serialize};

/// Weights and thresholds backing the fraud signal checks.
///
/// Defaults match the production rule set; tests and deployments can tune
/// individual dials without touching the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudConfig {
    /// Numeric score at or above which a non-categorical check still blocks.
    pub block_threshold: u8,
    pub business_mismatch_points: u8,
    pub high_velocity_points: u8,
    /// Redemptions within the last hour that trip the hourly limit.
    pub hourly_limit: usize,
    pub hourly_limit_points: u8,
    /// Redemptions within the last 24 hours that trip the daily limit.
    pub daily_limit: usize,
    pub daily_limit_points: u8,
    pub high_amount_cents: i64,
    pub high_amount_points: u8,
    pub below_min_spend_points: u8,
    pub round_amount_step_cents: i64,
    pub round_amount_floor_cents: i64,
    pub round_amount_points: u8,
    /// Cap on a payee's cumulative 24h redemption volume, this amount included.
    pub daily_amount_cap_cents: i64,
    pub daily_amount_points: u8,
    /// Prior same-amount redemptions today needed to flag a repeat pattern.
    pub repeated_amounts_threshold: usize,
    pub repeated_amounts_points: u8,
    pub invalid_location_points: u8,
    pub inactive_location_points: u8,
    pub blacklisted_ip_points: u8,
    pub vpn_proxy_points: u8,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            block_threshold: 70,
            business_mismatch_points: 50,
            high_velocity_points: 30,
            hourly_limit: 5,
            hourly_limit_points: 40,
            daily_limit: 20,
            daily_limit_points: 50,
            high_amount_cents: 50_000,
            high_amount_points: 25,
            below_min_spend_points: 20,
            round_amount_step_cents: 1_000,
            round_amount_floor_cents: 5_000,
            round_amount_points: 10,
            daily_amount_cap_cents: 200_000,
            daily_amount_points: 30,
            repeated_amounts_threshold: 3,
            repeated_amounts_points: 20,
            invalid_location_points: 40,
            inactive_location_points: 30,
            blacklisted_ip_points: 60,
            vpn_proxy_points: 15,
        }
    }
}
