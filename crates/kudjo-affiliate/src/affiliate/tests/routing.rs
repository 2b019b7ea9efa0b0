use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::affiliate::domain::RedemptionId;
use crate::affiliate::ledger::PayoutMethod;

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn fraud_check_returns_the_evaluation() {
    let fraud_store = Arc::new(MemoryFraudStore::with_coupon(coupon()));
    let router = test_router(fraud_store, Arc::new(MemoryLedgerStore::default()));

    let request = post_json(
        "/api/v1/fraud/check",
        serde_json::to_value(context()).expect("context serializes"),
    );
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["score"], 0);
    assert_eq!(body["blocked"], false);
    assert_eq!(body["risk_level"], "low");
    assert_eq!(body["flags"].as_array().expect("flags array").len(), 0);
}

#[tokio::test]
async fn blocked_fraud_check_leaves_an_audit_record() {
    let fraud_store = Arc::new(MemoryFraudStore::default());
    let router = test_router(fraud_store.clone(), Arc::new(MemoryLedgerStore::default()));

    let mut ctx = context();
    ctx.coupon_code = crate::affiliate::domain::CouponCode("GHOST".to_string());
    let request = post_json(
        "/api/v1/fraud/check",
        serde_json::to_value(ctx).expect("context serializes"),
    );
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["blocked"], true);
    assert_eq!(body["flags"][0], "INVALID_COUPON");
    assert_eq!(fraud_store.logs().len(), 1);
}

#[tokio::test]
async fn allowed_low_risk_check_is_not_audited() {
    let fraud_store = Arc::new(MemoryFraudStore::with_coupon(coupon()));
    let router = test_router(fraud_store.clone(), Arc::new(MemoryLedgerStore::default()));

    let request = post_json(
        "/api/v1/fraud/check",
        serde_json::to_value(context()).expect("context serializes"),
    );
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(fraud_store.logs().is_empty());
}

#[tokio::test]
async fn fraud_check_surfaces_store_failures() {
    let state = crate::affiliate::router::AffiliateState {
        fraud: Arc::new(crate::affiliate::fraud::FraudEvaluator::new(
            Arc::new(UnavailableFraudStore),
            crate::affiliate::fraud::FraudConfig::default(),
        )),
        ledger: Arc::new(ledger(
            Arc::new(MemoryLedgerStore::default()),
            Arc::new(AcceptingGateway { fee_cents: 0 }),
        )),
    };
    let router = crate::affiliate::router::affiliate_router(state);

    let request = post_json(
        "/api/v1/fraud/check",
        serde_json::to_value(context()).expect("context serializes"),
    );
    let response = router.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("unavailable"));
}

fn funded_store(amount_cents: i64) -> Arc<MemoryLedgerStore> {
    let store = Arc::new(MemoryLedgerStore::default());
    let service = ledger(store.clone(), Arc::new(AcceptingGateway { fee_cents: 0 }));
    service
        .record_earning(
            &payee(),
            amount_cents,
            RedemptionId("red-http".to_string()),
            "camp-001".to_string(),
            business(),
            "system",
        )
        .expect("seed earning posts");
    store
}

#[tokio::test]
async fn payout_request_round_trips_through_the_api() {
    let ledger_store = funded_store(10_000);
    let router = test_router(Arc::new(MemoryFraudStore::default()), ledger_store);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/payouts",
            json!({
                "payee_id": "inf-001",
                "amount_cents": 5_000,
                "method": "bank_transfer",
                "details": { "account_last4": "4321" },
            }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["payout"]["status"], "pending");
    let payout_id = body["payout_id"].as_str().expect("payout id").to_string();

    let response = router
        .clone()
        .oneshot(get("/api/v1/payees/inf-001/balance"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let balance = read_json_body(response).await;
    assert_eq!(balance["available_balance_cents"], 5_000);
    assert_eq!(balance["pending_payouts_cents"], 5_000);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/payouts/{payout_id}/process"),
            json!({ "actor": "ops" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["payout"]["status"], "completed");
    assert_eq!(body["payout"]["processing_fee_cents"], 145);
}

#[tokio::test]
async fn rejected_payout_maps_to_unprocessable_entity() {
    let ledger_store = funded_store(10_000);
    let router = test_router(Arc::new(MemoryFraudStore::default()), ledger_store);

    let response = router
        .oneshot(post_json(
            "/api/v1/payouts",
            json!({
                "payee_id": "inf-001",
                "amount_cents": 500,
                "method": "paypal",
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("minimum"));
}

#[tokio::test]
async fn processing_an_unknown_payout_is_a_404() {
    let router = test_router(
        Arc::new(MemoryFraudStore::default()),
        Arc::new(MemoryLedgerStore::default()),
    );

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/payouts/pay-missing/process")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reprocessing_a_completed_payout_is_a_conflict() {
    let ledger_store = funded_store(10_000);
    let service = ledger(
        ledger_store.clone(),
        Arc::new(AcceptingGateway { fee_cents: 0 }),
    );
    let request = service
        .create_payout_request(
            &payee(),
            5_000,
            PayoutMethod::BankTransfer,
            bank_details(),
            "api",
        )
        .expect("payout reserved");
    service
        .process_payout_request(&request.id, "ops")
        .expect("payout processes");

    let router = test_router(Arc::new(MemoryFraudStore::default()), ledger_store);
    let response = router
        .oneshot(post_json(
            &format!("/api/v1/payouts/{}/process", request.id.0),
            json!({}),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("already"));
}

#[tokio::test]
async fn ledger_history_respects_query_pagination() {
    let ledger_store = funded_store(10_000);
    let service = ledger(
        ledger_store.clone(),
        Arc::new(AcceptingGateway { fee_cents: 0 }),
    );
    service
        .create_payout_request(
            &payee(),
            2_000,
            PayoutMethod::BankTransfer,
            bank_details(),
            "api",
        )
        .expect("payout reserved");

    let router = test_router(Arc::new(MemoryFraudStore::default()), ledger_store);
    let response = router
        .clone()
        .oneshot(get("/api/v1/payees/inf-001/ledger"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().expect("entry array").len(), 2);

    let response = router
        .oneshot(get("/api/v1/payees/inf-001/ledger?limit=1&offset=1"))
        .await
        .expect("router responds");
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().expect("entry array").len(), 1);
}

#[tokio::test]
async fn payout_history_filters_by_payee() {
    let ledger_store = funded_store(10_000);
    let service = ledger(
        ledger_store.clone(),
        Arc::new(AcceptingGateway { fee_cents: 0 }),
    );
    service
        .create_payout_request(
            &payee(),
            2_000,
            PayoutMethod::BankTransfer,
            bank_details(),
            "api",
        )
        .expect("payout reserved");

    let router = test_router(Arc::new(MemoryFraudStore::default()), ledger_store);
    let response = router
        .clone()
        .oneshot(get("/api/v1/payouts?payee_id=inf-001"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().expect("payout array").len(), 1);

    let response = router
        .oneshot(get("/api/v1/payouts?payee_id=inf-404"))
        .await
        .expect("router responds");
    let body = read_json_body(response).await;
    assert!(body.as_array().expect("payout array").is_empty());
}

#[tokio::test]
async fn payout_report_requires_a_date_range() {
    let ledger_store = funded_store(10_000);
    let service = ledger(
        ledger_store.clone(),
        Arc::new(AcceptingGateway { fee_cents: 0 }),
    );
    service
        .create_payout_request(
            &payee(),
            2_000,
            PayoutMethod::BankTransfer,
            bank_details(),
            "api",
        )
        .expect("payout reserved");

    let router = test_router(Arc::new(MemoryFraudStore::default()), ledger_store);
    let response = router
        .clone()
        .oneshot(get(
            "/api/v1/reports/payouts?start=2000-01-01T00:00:00Z&end=2100-01-01T00:00:00Z",
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["request_count"], 1);
    assert_eq!(body["total_requested_cents"], 2_000);

    let response = router
        .oneshot(get("/api/v1/reports/payouts"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
