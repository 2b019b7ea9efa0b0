use std::net::IpAddr;

use crate::affiliate::domain::{BusinessLocation, Coupon, RedemptionContext, RedemptionRecord};

use super::config::FraudConfig;
use super::policy::FraudFlag;

/// One triggered signal: the flag, its score contribution, and a note used
/// for audit logs and block reasons.
#[derive(Debug, Clone)]
pub(crate) struct SignalHit {
    pub(crate) flag: FraudFlag,
    pub(crate) points: u8,
    pub(crate) note: String,
}

impl SignalHit {
    fn new(flag: FraudFlag, points: u8, note: String) -> Self {
        Self { flag, points, note }
    }
}

pub(crate) fn check_business_match(
    coupon: &Coupon,
    ctx: &RedemptionContext,
    config: &FraudConfig,
    hits: &mut Vec<SignalHit>,
) {
    if coupon.business_id != ctx.business_id {
        hits.push(SignalHit::new(
            FraudFlag::BusinessMismatch,
            config.business_mismatch_points,
            format!(
                "coupon belongs to business {} but was redeemed at {}",
                coupon.business_id.0, ctx.business_id.0
            ),
        ));
    }
}

/// Velocity over the coupon's last 24 hours of redemptions, partitioned by
/// 5-minute, hourly, and daily windows. The three limits are independent and
/// may all fire on one request.
pub(crate) fn check_velocity(
    history: &[RedemptionRecord],
    ctx: &RedemptionContext,
    config: &FraudConfig,
    hits: &mut Vec<SignalHit>,
) {
    let five_minutes_ago = ctx.timestamp - chrono::Duration::minutes(5);
    let hour_ago = ctx.timestamp - chrono::Duration::hours(1);

    let recent = history
        .iter()
        .filter(|record| record.redeemed_at > five_minutes_ago)
        .count();
    let hourly = history
        .iter()
        .filter(|record| record.redeemed_at > hour_ago)
        .count();
    let daily = history.len();

    if recent > 0 {
        hits.push(SignalHit::new(
            FraudFlag::HighVelocity,
            config.high_velocity_points,
            format!("{recent} redemption(s) within the last 5 minutes"),
        ));
    }
    if hourly >= config.hourly_limit {
        hits.push(SignalHit::new(
            FraudFlag::HourlyLimitExceeded,
            config.hourly_limit_points,
            format!("{hourly} redemptions in the last hour (limit {})", config.hourly_limit),
        ));
    }
    if daily >= config.daily_limit {
        hits.push(SignalHit::new(
            FraudFlag::DailyLimitExceeded,
            config.daily_limit_points,
            format!("{daily} redemptions in the last 24h (limit {})", config.daily_limit),
        ));
    }
}

pub(crate) fn check_amount(
    coupon: &Coupon,
    ctx: &RedemptionContext,
    config: &FraudConfig,
    hits: &mut Vec<SignalHit>,
) {
    if ctx.amount_cents > config.high_amount_cents {
        hits.push(SignalHit::new(
            FraudFlag::HighAmount,
            config.high_amount_points,
            format!(
                "amount {} cents exceeds high-amount threshold {}",
                ctx.amount_cents, config.high_amount_cents
            ),
        ));
    }

    if let Some(min_spend) = coupon.min_spend_cents {
        if ctx.amount_cents < min_spend {
            hits.push(SignalHit::new(
                FraudFlag::BelowMinSpend,
                config.below_min_spend_points,
                format!("amount {} cents under coupon minimum spend {min_spend}", ctx.amount_cents),
            ));
        }
    }

    // Suspiciously round figures above the floor hint at manually fabricated entries.
    if ctx.amount_cents > config.round_amount_floor_cents
        && ctx.amount_cents % config.round_amount_step_cents == 0
    {
        hits.push(SignalHit::new(
            FraudFlag::RoundAmount,
            config.round_amount_points,
            format!("round amount {} cents", ctx.amount_cents),
        ));
    }
}

/// Pattern checks over the payee's own redemptions in the last 24 hours.
pub(crate) fn check_spend_pattern(
    payee_history: &[RedemptionRecord],
    ctx: &RedemptionContext,
    config: &FraudConfig,
    hits: &mut Vec<SignalHit>,
) {
    let prior_total: i64 = payee_history.iter().map(|record| record.amount_cents).sum();
    if prior_total + ctx.amount_cents > config.daily_amount_cap_cents {
        hits.push(SignalHit::new(
            FraudFlag::DailyAmountExceeded,
            config.daily_amount_points,
            format!(
                "payee daily volume {} cents would exceed cap {}",
                prior_total + ctx.amount_cents,
                config.daily_amount_cap_cents
            ),
        ));
    }

    let same_amount = payee_history
        .iter()
        .filter(|record| record.amount_cents == ctx.amount_cents)
        .count();
    if same_amount >= config.repeated_amounts_threshold {
        hits.push(SignalHit::new(
            FraudFlag::RepeatedAmounts,
            config.repeated_amounts_points,
            format!("{same_amount} prior redemptions today with the exact same amount"),
        ));
    }
}

pub(crate) fn check_location(
    location: Option<&BusinessLocation>,
    ctx: &RedemptionContext,
    config: &FraudConfig,
    hits: &mut Vec<SignalHit>,
) {
    match location {
        None => hits.push(SignalHit::new(
            FraudFlag::InvalidLocation,
            config.invalid_location_points,
            format!(
                "location {:?} is not registered under business {}",
                ctx.location_id.as_ref().map(|id| id.0.as_str()),
                ctx.business_id.0
            ),
        )),
        Some(location) if !location.active => hits.push(SignalHit::new(
            FraudFlag::InactiveLocation,
            config.inactive_location_points,
            format!("location {} is inactive", location.location_id.0),
        )),
        Some(_) => {}
    }
}

pub(crate) fn check_ip(
    ip_address: &str,
    blacklisted: bool,
    config: &FraudConfig,
    hits: &mut Vec<SignalHit>,
) {
    if blacklisted {
        hits.push(SignalHit::new(
            FraudFlag::BlacklistedIp,
            config.blacklisted_ip_points,
            format!("ip {ip_address} is blacklisted"),
        ));
    }

    if looks_like_private_range(ip_address) {
        hits.push(SignalHit::new(
            FraudFlag::VpnProxy,
            config.vpn_proxy_points,
            format!("ip {ip_address} falls in a private range"),
        ));
    }
}

// Deliberately simplistic: private IPv4 ranges are a weak proxy for tunnelled
// traffic, worth a small score bump but never a block on its own.
fn looks_like_private_range(ip_address: &str) -> bool {
    match ip_address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_private(),
        Ok(IpAddr::V6(_)) | Err(_) => false,
    }
}
