use std::sync::Arc;

use axum::extract::{FromRef, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, ApplicationSubmission};
use super::repository::{ApplicationRepository, ApplicationStatusView};
use super::service::{AdmissionsService, AdmissionsServiceError};
use crate::accounts::auth::{AuthUser, JwtAuth};
use crate::accounts::repository::UserRepository;
use crate::notifications::NotificationSender;
use crate::payments::gateway::{GatewayError, PaymentGateway, SignedCallback};
use crate::payments::ledger::{LedgerError, PaymentLedger};

/// State shared by the applicant-facing routes.
pub struct ApplicantState<R, L, G, U, N> {
    pub service: Arc<AdmissionsService<R, L, G, U, N>>,
    pub auth: JwtAuth,
}

impl<R, L, G, U, N> Clone for ApplicantState<R, L, G, U, N> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            auth: self.auth.clone(),
        }
    }
}

impl<R, L, G, U, N> FromRef<ApplicantState<R, L, G, U, N>> for JwtAuth {
    fn from_ref(state: &ApplicantState<R, L, G, U, N>) -> Self {
        state.auth.clone()
    }
}

/// Router builder exposing the applicant HTTP surface.
pub fn applicant_router<R, L, G, U, N>(state: ApplicantState<R, L, G, U, N>) -> Router
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(submit_handler::<R, L, G, U, N>).get(my_applications_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/payment/order",
            post(create_order_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/payments/verify",
            post(verify_payment_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/payments/:order_id/failure",
            post(payment_failure_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/payments/:order_id/cancel",
            post(payment_cancel_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/admit-card",
            get(admit_card_handler::<R, L, G, U, N>),
        )
        .route(
            "/api/v1/applications/:application_id/admit-card/download",
            get(admit_card_download_handler::<R, L, G, U, N>),
        )
        .with_state(state)
}

async fn submit_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(user_id): AuthUser,
    Json(submission): Json<ApplicationSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match state.service.submit(&user_id, submission) {
        Ok(application) => (
            StatusCode::CREATED,
            Json(ApplicationStatusView::from_application(&application)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn my_applications_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(user_id): AuthUser,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match state.service.my_applications(&user_id) {
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

async fn application_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(user_id): AuthUser,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let id = ApplicationId(application_id);
    match state.service.get_application(&user_id, &id) {
        Ok(application) => (
            StatusCode::OK,
            Json(ApplicationStatusView::from_application(&application)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_order_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(user_id): AuthUser,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let id = ApplicationId(application_id);
    match state.service.create_payment_order(&user_id, &id).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Callback endpoint: the signature is the authentication, so no bearer
/// token is demanded here.
async fn verify_payment_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    Json(callback): Json<SignedCallback>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match state.service.verify_payment(&callback) {
        Ok(application) => (
            StatusCode::OK,
            Json(ApplicationStatusView::from_application(&application)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct FailureReport {
    #[serde(default)]
    reason: Option<String>,
}

async fn payment_failure_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(_user_id): AuthUser,
    Path(order_id): Path<String>,
    Json(report): Json<FailureReport>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let reason = report.reason.as_deref().unwrap_or("payment failed");
    match state.service.report_payment_failure(&order_id, reason) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "recorded" }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn payment_cancel_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(_user_id): AuthUser,
    Path(order_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match state.service.cancel_payment(&order_id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "cancelled" }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn admit_card_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(user_id): AuthUser,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let id = ApplicationId(application_id);
    match state.service.admit_card(&user_id, &id) {
        Ok((application, card)) => (
            StatusCode::OK,
            Json(json!({
                "application_number": application.application_number,
                "roll_number": card.roll_number,
                "exam_date": card.exam_date,
                "exam_time": card.exam_time,
                "exam_center": card.exam_center,
                "issued_at": card.issued_at,
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn admit_card_download_handler<R, L, G, U, N>(
    State(state): State<ApplicantState<R, L, G, U, N>>,
    AuthUser(user_id): AuthUser,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    let id = ApplicationId(application_id);
    match state.service.render_admit_card(&user_id, &id) {
        Ok(document) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, document.content_type)],
            document.bytes,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// Map service errors onto the HTTP taxonomy: validation 422, preconditions
/// 409, missing records 404, gateway unavailability 502/503.
pub(crate) fn error_response(err: AdmissionsServiceError) -> Response {
    use AdmissionsServiceError as E;

    let status = match &err {
        E::Intake(_) | E::InvalidSignature => StatusCode::UNPROCESSABLE_ENTITY,
        E::AlreadyApplied
        | E::AlreadyPaid
        | E::AdmitCardUnavailable { .. }
        | E::Transition(_) => StatusCode::CONFLICT,
        E::AdmitCardWithheld => StatusCode::FORBIDDEN,
        E::ApplicationNotFound | E::UserNotFound | E::OrderNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        E::Gateway(GatewayError::Unconfigured) => StatusCode::SERVICE_UNAVAILABLE,
        E::Gateway(_) => StatusCode::BAD_GATEWAY,
        E::Ledger(LedgerError::DuplicateOrder { .. }) => StatusCode::CONFLICT,
        E::Ledger(LedgerError::NotFound { .. }) => StatusCode::NOT_FOUND,
        E::Ledger(_)
        | E::Repository(_)
        | E::Users(_)
        | E::Release(_)
        | E::Render(_)
        | E::Reconciliation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
