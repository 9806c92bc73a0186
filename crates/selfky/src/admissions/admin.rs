use std::sync::Arc;

use axum::extract::{FromRef, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationStatus, CourseType};
use super::repository::{ApplicationFilter, ApplicationRepository, ApplicationStatusView};
use super::router::error_response;
use super::service::AdmissionsService;
use crate::accounts::auth::{AdminGate, RequireAdmin};
use crate::accounts::repository::UserRepository;
use crate::notifications::NotificationSender;
use crate::payments::domain::{PaymentRecord, PaymentState};
use crate::payments::gateway::PaymentGateway;
use crate::payments::ledger::{PaymentFilter, PaymentLedger};

const DEFAULT_SWEEP_HOURS: i64 = 24;

/// State shared by the operator routes.
pub struct AdminState<R, L, G, U, N> {
    pub service: Arc<AdmissionsService<R, L, G, U, N>>,
    pub gate: AdminGate,
}

impl<R, L, G, U, N> Clone for AdminState<R, L, G, U, N> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            gate: self.gate.clone(),
        }
    }
}

impl<R, L, G, U, N> FromRef<AdminState<R, L, G, U, N>> for AdminGate {
    fn from_ref(state: &AdminState<R, L, G, U, N>) -> Self {
        state.gate.clone()
    }
}

/// Router builder exposing the admin surface: listings, reconciliation,
/// the abandonment sweep, and the admit-card release toggle.
pub fn admin_router<R, L, G, U, N>(state: AdminState<R, L, G, U, N>) -> Router
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route(
            "/api/v1/admin/applications",
            get(list_applications_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/admin/payments",
            get(list_payments_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/admin/payments/export",
            get(export_payments_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/admin/reconcile",
            post(reconcile_handler::<R, L, G, U, N>),
        )
        .route("/api/v1/admin/sweep", post(sweep_handler::<R, L, G, U, N>))
        .route(
            "/api/v1/admin/admit-card-release",
            get(release_state_handler::<R, L, G, U, N>)
                .put(set_release_handler::<R, L, G, U, N>),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ApplicationQuery {
    #[serde(default)]
    status: Option<ApplicationStatus>,
    #[serde(default)]
    course: Option<CourseType>,
}

async fn list_applications_handler<R, L, G, U, N>(
    _admin: RequireAdmin,
    State(state): State<AdminState<R, L, G, U, N>>,
    Query(query): Query<ApplicationQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let filter = ApplicationFilter {
        status: query.status,
        course_type: query.course,
    };
    match state.service.list_applications(&filter) {
        Ok(applications) => {
            let views: Vec<ApplicationStatusView> = applications
                .iter()
                .map(ApplicationStatusView::from_application)
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct PaymentQuery {
    #[serde(default)]
    status: Option<PaymentState>,
}

async fn list_payments_handler<R, L, G, U, N>(
    _admin: RequireAdmin,
    State(state): State<AdminState<R, L, G, U, N>>,
    Query(query): Query<PaymentQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let filter = PaymentFilter {
        status: query.status,
    };
    match state.service.list_payments(&filter) {
        Ok(payments) => (StatusCode::OK, Json(payments)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn export_payments_handler<R, L, G, U, N>(
    _admin: RequireAdmin,
    State(state): State<AdminState<R, L, G, U, N>>,
    Query(query): Query<PaymentQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let filter = PaymentFilter {
        status: query.status,
    };
    let payments = match state.service.list_payments(&filter) {
        Ok(payments) => payments,
        Err(err) => return error_response(err),
    };

    match payments_csv(&payments) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"payments.csv\"",
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err })),
        )
            .into_response(),
    }
}

fn payments_csv(payments: &[PaymentRecord]) -> Result<Vec<u8>, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "payment_id",
            "application_id",
            "gateway_order_id",
            "gateway_payment_id",
            "amount",
            "currency",
            "status",
            "receipt",
            "created_at",
            "paid_at",
        ])
        .map_err(|err| err.to_string())?;

    for payment in payments {
        let amount = payment.amount.to_string();
        let created_at = payment.created_at.to_rfc3339();
        let paid_at = payment
            .paid_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        writer
            .write_record([
                payment.id.0.as_str(),
                payment.application_id.0.as_str(),
                payment.gateway_order_id.as_str(),
                payment.gateway_payment_id.as_deref().unwrap_or(""),
                amount.as_str(),
                payment.currency.as_str(),
                payment.status.label(),
                payment.receipt.as_str(),
                created_at.as_str(),
                paid_at.as_str(),
            ])
            .map_err(|err| err.to_string())?;
    }

    writer
        .into_inner()
        .map_err(|err| err.to_string())
}

async fn reconcile_handler<R, L, G, U, N>(
    _admin: RequireAdmin,
    State(state): State<AdminState<R, L, G, U, N>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match state.service.reconcile() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct SweepQuery {
    #[serde(default)]
    hours: Option<i64>,
}

async fn sweep_handler<R, L, G, U, N>(
    _admin: RequireAdmin,
    State(state): State<AdminState<R, L, G, U, N>>,
    Query(query): Query<SweepQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let hours = query.hours.unwrap_or(DEFAULT_SWEEP_HOURS).max(1);
    match state.service.sweep_stale_orders(hours) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn release_state_handler<R, L, G, U, N>(
    _admin: RequireAdmin,
    State(state): State<AdminState<R, L, G, U, N>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match state.service.release_state() {
        Ok(release) => (StatusCode::OK, Json(release)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseUpdate {
    released: bool,
}

async fn set_release_handler<R, L, G, U, N>(
    _admin: RequireAdmin,
    State(state): State<AdminState<R, L, G, U, N>>,
    Json(update): Json<ReleaseUpdate>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match state.service.set_release(update.released) {
        Ok(release) => (StatusCode::OK, Json(release)).into_response(),
        Err(err) => error_response(err),
    }
}
