use crate::cli::ServeArgs;
use crate::infra::{
    AppState, GatewayBackend, InMemoryApplicationRepository, InMemoryPaymentLedger,
    InMemoryReleaseGate, InMemoryUserRepository, LoggingNotificationSender, PlainTextRenderer,
};
use crate::routes::operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use selfky::accounts::{auth_router, AccountsService, AdminGate, JwtAuth};
use selfky::admissions::{
    admin_router, applicant_router, AdminState, AdmissionsService, ApplicantState,
};
use selfky::config::AppConfig;
use selfky::error::AppError;
use selfky::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let ledger = Arc::new(InMemoryPaymentLedger::default());
    let users = Arc::new(InMemoryUserRepository::default());
    let notifications = Arc::new(LoggingNotificationSender);
    let gateway = Arc::new(GatewayBackend::from_config(config.gateway.as_ref()));
    if config.gateway.is_none() {
        tracing::warn!("razorpay credentials absent; payment orders will answer 503");
    }

    let auth = JwtAuth::new(&config.auth.jwt_secret);
    let admin_gate = AdminGate::new(config.auth.admin_token.clone());
    if config.auth.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN unset; the admin surface is disabled");
    }

    let admissions_service = Arc::new(AdmissionsService::new(
        repository,
        ledger,
        gateway,
        users.clone(),
        notifications.clone(),
        Arc::new(InMemoryReleaseGate::default()),
        Arc::new(PlainTextRenderer),
        config.exam.clone(),
    ));
    let accounts_service = Arc::new(AccountsService::new(users, notifications, auth.clone()));

    let app = applicant_router(ApplicantState {
        service: admissions_service.clone(),
        auth,
    })
    .merge(admin_router(AdminState {
        service: admissions_service,
        gate: admin_gate,
    }))
    .merge(auth_router(accounts_service))
    .merge(operational_routes())
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
