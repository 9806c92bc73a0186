use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::UserId;

const TOKEN_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Shared JWT key material held in router state.
#[derive(Clone)]
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token issuance failed: {0}")]
    Issue(jsonwebtoken::errors::Error),
    #[error("invalid or expired token")]
    InvalidToken,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: &UserId) -> Result<String, AuthError> {
        let expiration = Utc::now() + Duration::days(TOKEN_VALIDITY_DAYS);
        let claims = Claims {
            sub: user_id.0.clone(),
            exp: expiration.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Issue)
    }

    pub fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(UserId(data.claims.sub))
    }
}

/// Authenticated applicant, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": message })),
    )
        .into_response()
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtAuth: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = JwtAuth::from_ref(state);
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let user_id = auth
            .authenticate(token)
            .map_err(|_| unauthorized("invalid or expired token"))?;
        Ok(AuthUser(user_id))
    }
}

/// Shared secret protecting the admin surface. Absent configuration keeps
/// the surface disabled rather than open.
#[derive(Clone, Default)]
pub struct AdminGate {
    token: Option<String>,
}

impl AdminGate {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    fn permits(&self, presented: Option<&str>) -> bool {
        match (&self.token, presented) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        }
    }
}

/// Marker extractor for admin handlers.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AdminGate: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = AdminGate::from_ref(state);
        let presented = parts
            .headers
            .get("x-admin-token")
            .and_then(|value| value.to_str().ok());

        if gate.permits(presented) {
            Ok(RequireAdmin)
        } else {
            Err((
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "admin access denied" })),
            )
                .into_response())
        }
    }
}
