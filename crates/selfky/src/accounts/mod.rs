//! Account registration, login, and password-reset flows, plus the JWT and
//! admin-token extractors the other routers lean on.

pub mod auth;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use auth::{AdminGate, AuthError, AuthUser, JwtAuth, RequireAdmin};
pub use domain::{ResetToken, User, UserId};
pub use repository::{UserRepository, UserRepositoryError};
pub use router::auth_router;
pub use service::{AccountsError, AccountsService, AuthenticatedUser};
