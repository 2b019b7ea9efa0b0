use crate::cli::ServeArgs;
use crate::infra::{fraud_config, ledger_config, AppState, InMemoryAffiliateStore};
use crate::routes::with_affiliate_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use kudjo_affiliate::affiliate::{
    AffiliateState, FraudEvaluator, PayoutLedger, SimulatedGateway,
};
use kudjo_affiliate::config::AppConfig;
use kudjo_affiliate::error::AppError;
use kudjo_affiliate::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryAffiliateStore::default());
    let state = AffiliateState {
        fraud: Arc::new(FraudEvaluator::new(store.clone(), fraud_config(&config))),
        ledger: Arc::new(PayoutLedger::new(
            store,
            Arc::new(SimulatedGateway::default()),
            ledger_config(&config),
        )),
    };

    let app = with_affiliate_routes(state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "affiliate payout service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
