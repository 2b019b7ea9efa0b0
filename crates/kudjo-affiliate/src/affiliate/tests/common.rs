use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::affiliate::domain::{
    BusinessId, BusinessLocation, Coupon, CouponCode, CouponStatus, CustomerInfo, Discount,
    LocationId, PayeeId, PayoutId, RedemptionContext, RedemptionId, RedemptionMethod,
    RedemptionRecord,
};
use crate::affiliate::fraud::{FraudConfig, FraudEvaluator, FraudLogRecord, FraudStore, StoreError};
use crate::affiliate::ledger::{
    LedgerConfig, LedgerEntry, LedgerEntryKind, LedgerSnapshot, LedgerStore, LedgerStoreError,
    PayoutLedger, PayoutMethod, PayoutRequest, PayoutStatus, SettlementError, SettlementProvider,
    SettlementReceipt,
};
use crate::affiliate::router::{affiliate_router, AffiliateState};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).single().expect("valid timestamp")
}

pub(super) fn payee() -> PayeeId {
    PayeeId("inf-001".to_string())
}

pub(super) fn business() -> BusinessId {
    BusinessId("biz-001".to_string())
}

pub(super) fn coupon() -> Coupon {
    Coupon {
        code: CouponCode("SUMMER20".to_string()),
        status: CouponStatus::Active,
        business_id: business(),
        payee_id: payee(),
        offer_id: "offer-001".to_string(),
        discount: Discount::Percentage {
            pct: 20,
            max_discount_cents: Some(2_000),
        },
        split_pct: 15,
        usage_count: 3,
        max_uses: 100,
        expires_at: now() + chrono::Duration::days(30),
        min_spend_cents: None,
        last_used_at: None,
    }
}

pub(super) fn context() -> RedemptionContext {
    RedemptionContext {
        coupon_code: CouponCode("SUMMER20".to_string()),
        amount_cents: 4_250,
        business_id: business(),
        location_id: None,
        customer: None,
        method: RedemptionMethod::Online,
        timestamp: now(),
    }
}

pub(super) fn context_with_ip(ip: &str) -> RedemptionContext {
    let mut ctx = context();
    ctx.customer = Some(CustomerInfo {
        email: Some("shopper@example.com".to_string()),
        phone: None,
        ip_address: Some(ip.to_string()),
    });
    ctx
}

pub(super) fn redemption(
    suffix: &str,
    amount_cents: i64,
    redeemed_at: DateTime<Utc>,
) -> RedemptionRecord {
    RedemptionRecord {
        redemption_id: RedemptionId(format!("red-{suffix}")),
        coupon_code: CouponCode("SUMMER20".to_string()),
        payee_id: payee(),
        business_id: business(),
        amount_cents,
        redeemed_at,
    }
}

#[derive(Default)]
pub(super) struct MemoryFraudStore {
    coupons: Mutex<HashMap<CouponCode, Coupon>>,
    redemptions: Mutex<Vec<RedemptionRecord>>,
    locations: Mutex<HashMap<(BusinessId, LocationId), BusinessLocation>>,
    blacklist: Mutex<HashSet<String>>,
    fraud_log: Mutex<Vec<FraudLogRecord>>,
}

impl MemoryFraudStore {
    pub(super) fn with_coupon(coupon: Coupon) -> Self {
        let store = Self::default();
        store.insert_coupon(coupon);
        store
    }

    pub(super) fn insert_coupon(&self, coupon: Coupon) {
        self.coupons
            .lock()
            .expect("coupon mutex poisoned")
            .insert(coupon.code.clone(), coupon);
    }

    pub(super) fn add_redemption(&self, record: RedemptionRecord) {
        self.redemptions
            .lock()
            .expect("redemption mutex poisoned")
            .push(record);
    }

    pub(super) fn add_location(&self, location: BusinessLocation) {
        self.locations.lock().expect("location mutex poisoned").insert(
            (location.business_id.clone(), location.location_id.clone()),
            location,
        );
    }

    pub(super) fn blacklist_ip(&self, ip: &str) {
        self.blacklist
            .lock()
            .expect("blacklist mutex poisoned")
            .insert(ip.to_string());
    }

    pub(super) fn logs(&self) -> Vec<FraudLogRecord> {
        self.fraud_log.lock().expect("log mutex poisoned").clone()
    }
}

impl FraudStore for MemoryFraudStore {
    fn coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        Ok(self
            .coupons
            .lock()
            .expect("coupon mutex poisoned")
            .get(code)
            .cloned())
    }

    fn redemptions_for_coupon_since(
        &self,
        code: &CouponCode,
        since: DateTime<Utc>,
    ) -> Result<Vec<RedemptionRecord>, StoreError> {
        Ok(self
            .redemptions
            .lock()
            .expect("redemption mutex poisoned")
            .iter()
            .filter(|record| &record.coupon_code == code && record.redeemed_at > since)
            .cloned()
            .collect())
    }

    fn redemptions_for_payee_since(
        &self,
        payee: &PayeeId,
        since: DateTime<Utc>,
    ) -> Result<Vec<RedemptionRecord>, StoreError> {
        Ok(self
            .redemptions
            .lock()
            .expect("redemption mutex poisoned")
            .iter()
            .filter(|record| &record.payee_id == payee && record.redeemed_at > since)
            .cloned()
            .collect())
    }

    fn location(
        &self,
        business: &BusinessId,
        location: &LocationId,
    ) -> Result<Option<BusinessLocation>, StoreError> {
        Ok(self
            .locations
            .lock()
            .expect("location mutex poisoned")
            .get(&(business.clone(), location.clone()))
            .cloned())
    }

    fn is_ip_blacklisted(&self, ip_address: &str) -> Result<bool, StoreError> {
        Ok(self
            .blacklist
            .lock()
            .expect("blacklist mutex poisoned")
            .contains(ip_address))
    }

    fn append_fraud_log(&self, record: FraudLogRecord) -> Result<(), StoreError> {
        self.fraud_log
            .lock()
            .expect("log mutex poisoned")
            .push(record);
        Ok(())
    }
}

pub(super) struct UnavailableFraudStore;

impl FraudStore for UnavailableFraudStore {
    fn coupon_by_code(&self, _code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    fn redemptions_for_coupon_since(
        &self,
        _code: &CouponCode,
        _since: DateTime<Utc>,
    ) -> Result<Vec<RedemptionRecord>, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    fn redemptions_for_payee_since(
        &self,
        _payee: &PayeeId,
        _since: DateTime<Utc>,
    ) -> Result<Vec<RedemptionRecord>, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    fn location(
        &self,
        _business: &BusinessId,
        _location: &LocationId,
    ) -> Result<Option<BusinessLocation>, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    fn is_ip_blacklisted(&self, _ip_address: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    fn append_fraud_log(&self, _record: FraudLogRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }
}

#[derive(Default)]
struct LedgerInner {
    entries: HashMap<PayeeId, Vec<LedgerEntry>>,
    versions: HashMap<PayeeId, u64>,
    payouts: Vec<PayoutRequest>,
    names: HashMap<PayeeId, String>,
}

#[derive(Default)]
pub(super) struct MemoryLedgerStore {
    inner: Mutex<LedgerInner>,
}

impl MemoryLedgerStore {
    pub(super) fn set_display_name(&self, payee: &PayeeId, name: &str) {
        self.inner
            .lock()
            .expect("ledger mutex poisoned")
            .names
            .insert(payee.clone(), name.to_string());
    }

    pub(super) fn entries_for(&self, payee: &PayeeId) -> Vec<LedgerEntry> {
        self.inner
            .lock()
            .expect("ledger mutex poisoned")
            .entries
            .get(payee)
            .cloned()
            .unwrap_or_default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn ledger_entries(&self, payee: &PayeeId) -> Result<LedgerSnapshot, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        let mut entries = inner.entries.get(payee).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(LedgerSnapshot {
            entries,
            version: inner.versions.get(payee).copied().unwrap_or(0),
        })
    }

    fn append_entry(
        &self,
        expected_version: Option<u64>,
        entry: LedgerEntry,
    ) -> Result<(), LedgerStoreError> {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        let version = inner.versions.get(&entry.payee_id).copied().unwrap_or(0);
        if let Some(expected) = expected_version {
            if expected != version {
                return Err(LedgerStoreError::VersionConflict {
                    payee: entry.payee_id.0.clone(),
                    expected,
                    found: version,
                });
            }
        }
        let payee = entry.payee_id.clone();
        inner.entries.entry(payee.clone()).or_default().push(entry);
        inner.versions.insert(payee, version + 1);
        Ok(())
    }

    fn reserve_payout(
        &self,
        expected_version: u64,
        request: PayoutRequest,
        entry: LedgerEntry,
    ) -> Result<(), LedgerStoreError> {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        let payee = request.payee_id.clone();
        let version = inner.versions.get(&payee).copied().unwrap_or(0);
        if expected_version != version {
            return Err(LedgerStoreError::VersionConflict {
                payee: payee.0,
                expected: expected_version,
                found: version,
            });
        }
        inner.payouts.push(request);
        inner.entries.entry(payee.clone()).or_default().push(entry);
        inner.versions.insert(payee, version + 1);
        Ok(())
    }

    fn earning_exists(&self, redemption: &RedemptionId) -> Result<bool, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner.entries.values().flatten().any(|entry| {
            entry.kind == LedgerEntryKind::Earning
                && entry.redemption_id.as_ref() == Some(redemption)
        }))
    }

    fn payout_by_id(&self, id: &PayoutId) -> Result<Option<PayoutRequest>, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner
            .payouts
            .iter()
            .find(|request| &request.id == id)
            .cloned())
    }

    fn update_payout(&self, request: PayoutRequest) -> Result<(), LedgerStoreError> {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        match inner.payouts.iter_mut().find(|stored| stored.id == request.id) {
            Some(stored) => {
                *stored = request;
                Ok(())
            }
            None => Err(LedgerStoreError::NotFound),
        }
    }

    fn payout_history(
        &self,
        payee: Option<&PayeeId>,
    ) -> Result<Vec<PayoutRequest>, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        let mut requests: Vec<PayoutRequest> = inner
            .payouts
            .iter()
            .filter(|request| payee.map_or(true, |payee| &request.payee_id == payee))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    fn payouts_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PayoutRequest>, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner
            .payouts
            .iter()
            .filter(|request| request.requested_at >= start && request.requested_at <= end)
            .cloned()
            .collect())
    }

    fn pending_payouts(&self, payee: &PayeeId) -> Result<Vec<PayoutRequest>, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner
            .payouts
            .iter()
            .filter(|request| {
                &request.payee_id == payee
                    && matches!(
                        request.status,
                        PayoutStatus::Pending | PayoutStatus::Processing
                    )
            })
            .cloned()
            .collect())
    }

    fn payees_for_business(
        &self,
        business: &BusinessId,
    ) -> Result<Vec<PayeeId>, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        let mut payees: Vec<PayeeId> = inner
            .entries
            .values()
            .flatten()
            .filter(|entry| {
                entry.kind == LedgerEntryKind::Earning
                    && entry.business_id.as_ref() == Some(business)
            })
            .map(|entry| entry.payee_id.clone())
            .collect();
        payees.sort();
        payees.dedup();
        Ok(payees)
    }

    fn payee_display_name(&self, payee: &PayeeId) -> Result<Option<String>, LedgerStoreError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner.names.get(payee).cloned())
    }
}

/// Gateway that always settles, with a fixed fee.
pub(super) struct AcceptingGateway {
    pub(super) fee_cents: i64,
}

impl SettlementProvider for AcceptingGateway {
    fn submit(&self, request: &PayoutRequest) -> Result<SettlementReceipt, SettlementError> {
        Ok(SettlementReceipt {
            transaction_id: format!("txn-{}", request.id.0),
            fee_cents: self.fee_cents,
        })
    }
}

/// Gateway that always declines.
pub(super) struct DecliningGateway;

impl SettlementProvider for DecliningGateway {
    fn submit(&self, _request: &PayoutRequest) -> Result<SettlementReceipt, SettlementError> {
        Err(SettlementError {
            reason: "insufficient provider float".to_string(),
        })
    }
}

pub(super) fn evaluator(store: Arc<MemoryFraudStore>) -> FraudEvaluator<MemoryFraudStore> {
    FraudEvaluator::new(store, FraudConfig::default())
}

pub(super) fn ledger<G: SettlementProvider + 'static>(
    store: Arc<MemoryLedgerStore>,
    gateway: Arc<G>,
) -> PayoutLedger<MemoryLedgerStore, G> {
    PayoutLedger::new(store, gateway, LedgerConfig::default())
}

/// Seed a payee with one earning entry of the given amount and return the
/// composed ledger service.
pub(super) fn funded_ledger(
    amount_cents: i64,
) -> (
    PayoutLedger<MemoryLedgerStore, AcceptingGateway>,
    Arc<MemoryLedgerStore>,
) {
    let store = Arc::new(MemoryLedgerStore::default());
    let service = ledger(store.clone(), Arc::new(AcceptingGateway { fee_cents: 0 }));
    service
        .record_earning(
            &payee(),
            amount_cents,
            RedemptionId(format!("red-seed-{amount_cents}")),
            "camp-001".to_string(),
            business(),
            "system",
        )
        .expect("seed earning posts");
    (service, store)
}

pub(super) fn bank_details() -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert("account_last4".to_string(), "4321".to_string());
    details.insert("routing_last4".to_string(), "0025".to_string());
    details
}

pub(super) fn default_method() -> PayoutMethod {
    PayoutMethod::BankTransfer
}

pub(super) fn test_router(
    fraud_store: Arc<MemoryFraudStore>,
    ledger_store: Arc<MemoryLedgerStore>,
) -> axum::Router {
    let state = AffiliateState {
        fraud: Arc::new(evaluator(fraud_store)),
        ledger: Arc::new(ledger(
            ledger_store,
            Arc::new(AcceptingGateway { fee_cents: 145 }),
        )),
    };
    affiliate_router(state)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
