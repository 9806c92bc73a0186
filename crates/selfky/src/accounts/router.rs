use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::repository::UserRepository;
use super::service::{AccountsError, AccountsService};
use crate::notifications::NotificationSender;

/// Router builder exposing the public authentication endpoints.
pub fn auth_router<U, N>(service: Arc<AccountsService<U, N>>) -> Router
where
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route("/api/v1/auth/register", post(register_handler::<U, N>))
        .route("/api/v1/auth/login", post(login_handler::<U, N>))
        .route(
            "/api/v1/auth/password-reset/request",
            post(reset_request_handler::<U, N>),
        )
        .route(
            "/api/v1/auth/password-reset/confirm",
            post(reset_confirm_handler::<U, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetConfirm {
    token: String,
    new_password: String,
}

async fn register_handler<U, N>(
    State(service): State<Arc<AccountsService<U, N>>>,
    Json(payload): Json<RegisterRequest>,
) -> Response
where
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.register(&payload.email, &payload.password, payload.name) {
        Ok(authenticated) => (
            StatusCode::CREATED,
            Json(json!({
                "user_id": authenticated.user_id.0,
                "token": authenticated.token,
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn login_handler<U, N>(
    State(service): State<Arc<AccountsService<U, N>>>,
    Json(payload): Json<LoginRequest>,
) -> Response
where
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.login(&payload.email, &payload.password) {
        Ok(authenticated) => (
            StatusCode::OK,
            Json(json!({
                "user_id": authenticated.user_id.0,
                "token": authenticated.token,
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn reset_request_handler<U, N>(
    State(service): State<Arc<AccountsService<U, N>>>,
    Json(payload): Json<ResetRequest>,
) -> Response
where
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.request_password_reset(&payload.email, Utc::now()) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "reset email queued if the account exists" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn reset_confirm_handler<U, N>(
    State(service): State<Arc<AccountsService<U, N>>>,
    Json(payload): Json<ResetConfirm>,
) -> Response
where
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    match service.reset_password(&payload.token, &payload.new_password, Utc::now()) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "password updated" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: AccountsError) -> Response {
    let status = match &err {
        AccountsError::EmailTaken => StatusCode::CONFLICT,
        AccountsError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AccountsError::InvalidEmail
        | AccountsError::WeakPassword
        | AccountsError::InvalidResetToken
        | AccountsError::ExpiredResetToken => StatusCode::UNPROCESSABLE_ENTITY,
        AccountsError::Hashing | AccountsError::Auth(_) | AccountsError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
