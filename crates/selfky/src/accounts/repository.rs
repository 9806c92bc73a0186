use super::domain::{User, UserId};

/// Storage abstraction for accounts. Implementations enforce email
/// uniqueness case-insensitively.
pub trait UserRepository: Send + Sync {
    fn insert(&self, user: User) -> Result<User, UserRepositoryError>;
    fn update(&self, user: User) -> Result<(), UserRepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;
    fn fetch_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;
    fn fetch_by_reset_token(&self, token: &str) -> Result<Option<User>, UserRepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("account already exists")]
    Conflict,
    #[error("account not found")]
    NotFound,
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}
