use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use clap::Args;

use crate::infra::InMemoryAffiliateStore;
use kudjo_affiliate::affiliate::{
    BusinessId, BusinessLocation, Coupon, CouponCode, CouponStatus, CustomerInfo, Discount,
    FraudConfig, FraudEvaluator, LedgerConfig, LocationId, PayeeId, PayoutLedger, PayoutMethod,
    RedemptionContext, RedemptionId, RedemptionMethod, RedemptionRecord, SimulatedGateway,
};
use kudjo_affiliate::error::AppError;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Earning amount in cents credited per processed redemption.
    #[arg(long)]
    pub(crate) earning_cents: Option<i64>,
    /// Payout amount in cents requested at the end of the walkthrough.
    #[arg(long)]
    pub(crate) payout_cents: Option<i64>,
    /// Skip the payout portion of the demo.
    #[arg(long)]
    pub(crate) skip_payout: bool,
}

/// Seeded walkthrough of the full affiliate flow: fraud checks with three
/// different outcomes, earnings posting, and a payout settled through the
/// simulated gateway.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let earning_cents = args.earning_cents.unwrap_or(12_500);
    let payout_cents = args.payout_cents.unwrap_or(5_000);

    let payee = PayeeId("inf-demo".to_string());
    let business = BusinessId("biz-demo".to_string());

    let store = Arc::new(InMemoryAffiliateStore::default());
    store.seed_coupon(Coupon {
        code: CouponCode("SUMMER20".to_string()),
        status: CouponStatus::Active,
        business_id: business.clone(),
        payee_id: payee.clone(),
        offer_id: "offer-demo".to_string(),
        discount: Discount::Percentage {
            pct: 20,
            max_discount_cents: Some(2_000),
        },
        split_pct: 15,
        usage_count: 0,
        max_uses: 100,
        expires_at: Utc::now() + chrono::Duration::days(30),
        min_spend_cents: None,
        last_used_at: None,
    });
    store.seed_location(BusinessLocation {
        location_id: LocationId("loc-demo-1".to_string()),
        business_id: business.clone(),
        label: "Flagship".to_string(),
        active: true,
    });
    store.seed_blacklisted_ip("203.0.113.66");
    store.seed_display_name(&payee, "Demo Influencer");

    let evaluator = FraudEvaluator::new(store.clone(), FraudConfig::default());
    let ledger = PayoutLedger::new(
        store.clone(),
        Arc::new(SimulatedGateway::default()),
        LedgerConfig::default(),
    );

    println!("Affiliate payout service demo");
    println!();
    println!("== Fraud checks ==");

    let clean = RedemptionContext {
        coupon_code: CouponCode("SUMMER20".to_string()),
        amount_cents: 4_250,
        business_id: business.clone(),
        location_id: Some(LocationId("loc-demo-1".to_string())),
        customer: None,
        method: RedemptionMethod::Pos,
        timestamp: Utc::now(),
    };
    let verdict = evaluator.check_redemption(&clean)?;
    println!(
        "  clean POS redemption:      score {:>3}  risk {:<8} blocked {}",
        verdict.score,
        verdict.risk_level.label(),
        verdict.blocked
    );

    let mismatched = RedemptionContext {
        business_id: BusinessId("biz-other".to_string()),
        ..clean.clone()
    };
    let verdict = evaluator.check_redemption(&mismatched)?;
    println!(
        "  wrong-business redemption: score {:>3}  risk {:<8} blocked {}  flags {:?}",
        verdict.score,
        verdict.risk_level.label(),
        verdict.blocked,
        verdict
            .flags
            .iter()
            .map(|flag| flag.label())
            .collect::<Vec<_>>()
    );

    let blacklisted = RedemptionContext {
        customer: Some(CustomerInfo {
            email: None,
            phone: None,
            ip_address: Some("203.0.113.66".to_string()),
        }),
        method: RedemptionMethod::Online,
        location_id: None,
        ..clean.clone()
    };
    let verdict = evaluator.check_redemption(&blacklisted)?;
    evaluator.log_fraud_attempt(&blacklisted, &verdict)?;
    println!(
        "  blacklisted-ip redemption: score {:>3}  risk {:<8} blocked {}",
        verdict.score,
        verdict.risk_level.label(),
        verdict.blocked
    );
    if let Some(reason) = &verdict.reason {
        println!("    reason: {reason}");
    }
    println!("  audit log entries: {}", store.fraud_log().len());

    println!();
    println!("== Ledger ==");

    store.record_redemption(RedemptionRecord {
        redemption_id: RedemptionId("red-demo-1".to_string()),
        coupon_code: CouponCode("SUMMER20".to_string()),
        payee_id: payee.clone(),
        business_id: business.clone(),
        amount_cents: clean.amount_cents,
        redeemed_at: Utc::now(),
    });
    ledger.record_earning(
        &payee,
        earning_cents,
        RedemptionId("red-demo-1".to_string()),
        "camp-demo".to_string(),
        business.clone(),
        "demo",
    )?;

    let balance = ledger.calculate_balance(&payee)?;
    println!(
        "  earnings {} cents, available {} cents",
        balance.total_earnings_cents, balance.available_balance_cents
    );

    if args.skip_payout {
        println!("  payout skipped");
        return Ok(());
    }

    let mut details = BTreeMap::new();
    details.insert("account_last4".to_string(), "4321".to_string());
    let request = ledger.create_payout_request(
        &payee,
        payout_cents,
        PayoutMethod::BankTransfer,
        details,
        "demo",
    )?;
    println!(
        "  payout {} reserved: {} cents via {}",
        request.id.0,
        request.amount_cents,
        request.method.label()
    );

    let processed = ledger.process_payout_request(&request.id, "demo")?;
    println!(
        "  payout {} is {}{}",
        processed.id.0,
        processed.status.label(),
        processed
            .external_transaction_id
            .as_deref()
            .map(|txn| format!(" (txn {txn})"))
            .unwrap_or_default()
    );
    if let Some(fee) = processed.processing_fee_cents {
        println!("  processing fee: {fee} cents");
    }
    if let Some(notes) = &processed.notes {
        println!("  notes: {notes}");
    }

    let balance = ledger.calculate_balance(&payee)?;
    println!(
        "  final balance: available {} cents, lifetime payouts {} cents",
        balance.available_balance_cents, balance.total_payouts_cents
    );

    Ok(())
}
