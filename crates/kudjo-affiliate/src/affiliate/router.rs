use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{BusinessId, PayeeId, PayoutId, RedemptionContext};
use super::fraud::{FraudEvaluator, FraudStore, RiskLevel};
use super::ledger::{
    LedgerError, LedgerStore, LedgerStoreError, PayoutLedger, PayoutMethod, PayoutRejection,
    SettlementProvider,
};

/// Handles shared by the HTTP handlers.
pub struct AffiliateState<FS, LS, G> {
    pub fraud: Arc<FraudEvaluator<FS>>,
    pub ledger: Arc<PayoutLedger<LS, G>>,
}

impl<FS, LS, G> Clone for AffiliateState<FS, LS, G> {
    fn clone(&self) -> Self {
        Self {
            fraud: Arc::clone(&self.fraud),
            ledger: Arc::clone(&self.ledger),
        }
    }
}

/// Router builder exposing the fraud-check and payout endpoints.
pub fn affiliate_router<FS, LS, G>(state: AffiliateState<FS, LS, G>) -> Router
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    Router::new()
        .route("/api/v1/fraud/check", post(fraud_check_handler::<FS, LS, G>))
        .route("/api/v1/payouts", post(create_payout_handler::<FS, LS, G>))
        .route("/api/v1/payouts", get(payout_history_handler::<FS, LS, G>))
        .route(
            "/api/v1/payouts/:payout_id/process",
            post(process_payout_handler::<FS, LS, G>),
        )
        .route(
            "/api/v1/payees/:payee_id/balance",
            get(balance_handler::<FS, LS, G>),
        )
        .route(
            "/api/v1/payees/:payee_id/ledger",
            get(ledger_history_handler::<FS, LS, G>),
        )
        .route(
            "/api/v1/reports/payouts",
            get(payout_report_handler::<FS, LS, G>),
        )
        .with_state(state)
}

pub(crate) async fn fraud_check_handler<FS, LS, G>(
    State(state): State<AffiliateState<FS, LS, G>>,
    axum::Json(ctx): axum::Json<RedemptionContext>,
) -> Response
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    let result = match state.fraud.check_redemption(&ctx) {
        Ok(result) => result,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    };

    // Blocked or high-risk evaluations leave an audit trail.
    if result.blocked || result.risk_level >= RiskLevel::High {
        if let Err(err) = state.fraud.log_fraud_attempt(&ctx, &result) {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    }

    (StatusCode::OK, axum::Json(result)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatePayoutBody {
    pub(crate) payee_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) method: PayoutMethod,
    #[serde(default)]
    pub(crate) details: BTreeMap<String, String>,
    #[serde(default = "default_actor")]
    pub(crate) actor: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProcessPayoutBody {
    #[serde(default = "default_actor")]
    pub(crate) actor: String,
}

fn default_actor() -> String {
    "api".to_string()
}

pub(crate) async fn create_payout_handler<FS, LS, G>(
    State(state): State<AffiliateState<FS, LS, G>>,
    axum::Json(body): axum::Json<CreatePayoutBody>,
) -> Response
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    let payee = PayeeId(body.payee_id);
    match state.ledger.create_payout_request(
        &payee,
        body.amount_cents,
        body.method,
        body.details,
        &body.actor,
    ) {
        Ok(request) => {
            let payload = json!({
                "success": true,
                "payout_id": request.id.0,
                "payout": request,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => ledger_error_response(err),
    }
}

pub(crate) async fn process_payout_handler<FS, LS, G>(
    State(state): State<AffiliateState<FS, LS, G>>,
    Path(payout_id): Path<String>,
    body: Option<axum::Json<ProcessPayoutBody>>,
) -> Response
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    let axum::Json(body) = body.unwrap_or_default();
    let id = PayoutId(payout_id);
    match state.ledger.process_payout_request(&id, &body.actor) {
        Ok(request) => {
            let payload = json!({
                "success": true,
                "payout": request,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => ledger_error_response(err),
    }
}

pub(crate) async fn balance_handler<FS, LS, G>(
    State(state): State<AffiliateState<FS, LS, G>>,
    Path(payee_id): Path<String>,
) -> Response
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    let payee = PayeeId(payee_id);
    match state.ledger.calculate_balance(&payee) {
        Ok(balance) => (StatusCode::OK, axum::Json(balance)).into_response(),
        Err(err) => ledger_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    pub(crate) payee_id: Option<String>,
    #[serde(default = "default_limit")]
    pub(crate) limit: usize,
    #[serde(default)]
    pub(crate) offset: usize,
}

fn default_limit() -> usize {
    50
}

pub(crate) async fn ledger_history_handler<FS, LS, G>(
    State(state): State<AffiliateState<FS, LS, G>>,
    Path(payee_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    let payee = PayeeId(payee_id);
    match state.ledger.ledger_history(&payee, query.limit, query.offset) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => ledger_error_response(err),
    }
}

pub(crate) async fn payout_history_handler<FS, LS, G>(
    State(state): State<AffiliateState<FS, LS, G>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    let payee = query.payee_id.map(PayeeId);
    match state
        .ledger
        .payout_history(payee.as_ref(), query.limit, query.offset)
    {
        Ok(requests) => (StatusCode::OK, axum::Json(requests)).into_response(),
        Err(err) => ledger_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportQuery {
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    #[serde(default)]
    pub(crate) business_id: Option<String>,
}

pub(crate) async fn payout_report_handler<FS, LS, G>(
    State(state): State<AffiliateState<FS, LS, G>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    FS: FraudStore + 'static,
    LS: LedgerStore + 'static,
    G: SettlementProvider + 'static,
{
    let business = query.business_id.map(BusinessId);
    match state
        .ledger
        .payout_report(query.start, query.end, business.as_ref())
    {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => ledger_error_response(err),
    }
}

fn ledger_error_response(err: LedgerError) -> Response {
    match err {
        LedgerError::Rejected(rejection) => {
            let status = match rejection {
                PayoutRejection::AlreadyProcessed(_) => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let payload = json!({
                "success": false,
                "error": rejection.to_string(),
            });
            (status, axum::Json(payload)).into_response()
        }
        LedgerError::Store(LedgerStoreError::NotFound) => {
            let payload = json!({
                "success": false,
                "error": "payout request not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        LedgerError::Store(err @ LedgerStoreError::VersionConflict { .. }) => {
            let payload = json!({
                "success": false,
                "error": err.to_string(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        LedgerError::Store(err) => {
            let payload = json!({
                "success": false,
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
