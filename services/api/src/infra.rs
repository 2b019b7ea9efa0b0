use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use kudjo_affiliate::affiliate::{
    BusinessId, BusinessLocation, Coupon, CouponCode, FraudConfig, FraudLogRecord, FraudStore,
    LedgerConfig, LedgerEntry, LedgerEntryKind, LedgerSnapshot, LedgerStore, LedgerStoreError,
    LocationId, PayeeId, PayoutId, PayoutRequest, PayoutStatus, RedemptionId, RedemptionRecord,
    StoreError,
};
use kudjo_affiliate::config::AppConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Single-process document store backing both the fraud evaluator and the
/// payout ledger. Campaign data (coupons, locations, the IP blacklist) is
/// seeded at startup or by the demo; ledger state accumulates at runtime.
#[derive(Default)]
pub(crate) struct InMemoryAffiliateStore {
    coupons: Mutex<HashMap<CouponCode, Coupon>>,
    redemptions: Mutex<Vec<RedemptionRecord>>,
    locations: Mutex<HashMap<(BusinessId, LocationId), BusinessLocation>>,
    blacklist: Mutex<HashSet<String>>,
    fraud_log: Mutex<Vec<FraudLogRecord>>,
    ledgers: Mutex<HashMap<PayeeId, (Vec<LedgerEntry>, u64)>>,
    payouts: Mutex<Vec<PayoutRequest>>,
    display_names: Mutex<HashMap<PayeeId, String>>,
}

impl InMemoryAffiliateStore {
    pub(crate) fn seed_coupon(&self, coupon: Coupon) {
        self.coupons
            .lock()
            .expect("coupon mutex poisoned")
            .insert(coupon.code.clone(), coupon);
    }

    pub(crate) fn seed_location(&self, location: BusinessLocation) {
        self.locations.lock().expect("location mutex poisoned").insert(
            (location.business_id.clone(), location.location_id.clone()),
            location,
        );
    }

    pub(crate) fn seed_blacklisted_ip(&self, ip: &str) {
        self.blacklist
            .lock()
            .expect("blacklist mutex poisoned")
            .insert(ip.to_string());
    }

    pub(crate) fn seed_display_name(&self, payee: &PayeeId, name: &str) {
        self.display_names
            .lock()
            .expect("name mutex poisoned")
            .insert(payee.clone(), name.to_string());
    }

    pub(crate) fn record_redemption(&self, record: RedemptionRecord) {
        self.redemptions
            .lock()
            .expect("redemption mutex poisoned")
            .push(record);
    }

    pub(crate) fn fraud_log(&self) -> Vec<FraudLogRecord> {
        self.fraud_log.lock().expect("log mutex poisoned").clone()
    }
}

impl FraudStore for InMemoryAffiliateStore {
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

impl LedgerStore for InMemoryAffiliateStore {
    fn ledger_entries(&self, payee: &PayeeId) -> Result<LedgerSnapshot, LedgerStoreError> {
        let ledgers = self.ledgers.lock().expect("ledger mutex poisoned");
        let (mut entries, version) = ledgers.get(payee).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(LedgerSnapshot { entries, version })
    }

    fn append_entry(
        &self,
        expected_version: Option<u64>,
        entry: LedgerEntry,
    ) -> Result<(), LedgerStoreError> {
        let mut ledgers = self.ledgers.lock().expect("ledger mutex poisoned");
        let slot = ledgers.entry(entry.payee_id.clone()).or_default();
        if let Some(expected) = expected_version {
            if expected != slot.1 {
                return Err(LedgerStoreError::VersionConflict {
                    payee: entry.payee_id.0.clone(),
                    expected,
                    found: slot.1,
                });
            }
        }
        slot.0.push(entry);
        slot.1 += 1;
        Ok(())
    }

    fn reserve_payout(
        &self,
        expected_version: u64,
        request: PayoutRequest,
        entry: LedgerEntry,
    ) -> Result<(), LedgerStoreError> {
        let mut ledgers = self.ledgers.lock().expect("ledger mutex poisoned");
        let slot = ledgers.entry(request.payee_id.clone()).or_default();
        if expected_version != slot.1 {
            return Err(LedgerStoreError::VersionConflict {
                payee: request.payee_id.0.clone(),
                expected: expected_version,
                found: slot.1,
            });
        }
        self.payouts
            .lock()
            .expect("payout mutex poisoned")
            .push(request);
        slot.0.push(entry);
        slot.1 += 1;
        Ok(())
    }

    fn earning_exists(&self, redemption: &RedemptionId) -> Result<bool, LedgerStoreError> {
        Ok(self
            .ledgers
            .lock()
            .expect("ledger mutex poisoned")
            .values()
            .flat_map(|(entries, _)| entries)
            .any(|entry| {
                entry.kind == LedgerEntryKind::Earning
                    && entry.redemption_id.as_ref() == Some(redemption)
            }))
    }

    fn payout_by_id(&self, id: &PayoutId) -> Result<Option<PayoutRequest>, LedgerStoreError> {
        Ok(self
            .payouts
            .lock()
            .expect("payout mutex poisoned")
            .iter()
            .find(|request| &request.id == id)
            .cloned())
    }

    fn update_payout(&self, request: PayoutRequest) -> Result<(), LedgerStoreError> {
        let mut payouts = self.payouts.lock().expect("payout mutex poisoned");
        match payouts.iter_mut().find(|stored| stored.id == request.id) {
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
        let mut requests: Vec<PayoutRequest> = self
            .payouts
            .lock()
            .expect("payout mutex poisoned")
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
        Ok(self
            .payouts
            .lock()
            .expect("payout mutex poisoned")
            .iter()
            .filter(|request| request.requested_at >= start && request.requested_at <= end)
            .cloned()
            .collect())
    }

    fn pending_payouts(&self, payee: &PayeeId) -> Result<Vec<PayoutRequest>, LedgerStoreError> {
        Ok(self
            .payouts
            .lock()
            .expect("payout mutex poisoned")
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
        let ledgers = self.ledgers.lock().expect("ledger mutex poisoned");
        let mut payees: Vec<PayeeId> = ledgers
            .values()
            .flat_map(|(entries, _)| entries)
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
        Ok(self
            .display_names
            .lock()
            .expect("name mutex poisoned")
            .get(payee)
            .cloned())
    }
}

pub(crate) fn fraud_config(config: &AppConfig) -> FraudConfig {
    FraudConfig {
        block_threshold: config.fraud.block_threshold,
        ..FraudConfig::default()
    }
}

pub(crate) fn ledger_config(config: &AppConfig) -> LedgerConfig {
    LedgerConfig {
        currency: config.payouts.currency.clone(),
        minimum_payout_cents: config.payouts.minimum_payout_cents,
        ..LedgerConfig::default()
    }
}
