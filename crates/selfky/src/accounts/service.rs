use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::auth::{AuthError, JwtAuth};
use super::domain::{ResetToken, User, UserId};
use super::repository::{UserRepository, UserRepositoryError};
use crate::notifications::{send_best_effort, Notification, NotificationSender};

const MIN_PASSWORD_LENGTH: usize = 8;
const RESET_TOKEN_VALIDITY_HOURS: i64 = 1;

/// Errors raised by account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email address is not plausible")]
    InvalidEmail,
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,
    #[error("password reset token is invalid")]
    InvalidResetToken,
    #[error("password reset token has expired")]
    ExpiredResetToken,
    #[error("password hashing failed")]
    Hashing,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] UserRepositoryError),
}

/// Successful login/registration payload.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub token: String,
}

/// Registration, login, and password-reset flows over the user store.
pub struct AccountsService<U, N> {
    users: Arc<U>,
    notifications: Arc<N>,
    auth: JwtAuth,
}

impl<U, N> AccountsService<U, N>
where
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    pub fn new(users: Arc<U>, notifications: Arc<N>, auth: JwtAuth) -> Self {
        Self {
            users,
            notifications,
            auth,
        }
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<AuthenticatedUser, AccountsError> {
        let email = normalize_email(email)?;
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AccountsError::WeakPassword);
        }
        if self.users.fetch_by_email(&email)?.is_some() {
            return Err(AccountsError::EmailTaken);
        }

        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|_| AccountsError::Hashing)?;

        let user = User {
            id: UserId(Uuid::new_v4().to_string()),
            email,
            password_hash,
            name,
            reset_token: None,
            created_at: Utc::now(),
        };

        let stored = match self.users.insert(user) {
            Ok(user) => user,
            Err(UserRepositoryError::Conflict) => return Err(AccountsError::EmailTaken),
            Err(other) => return Err(other.into()),
        };

        let token = self.auth.issue(&stored.id)?;
        Ok(AuthenticatedUser {
            user_id: stored.id,
            token,
        })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AccountsError> {
        let email = normalize_email(email)?;
        let Some(user) = self.users.fetch_by_email(&email)? else {
            return Err(AccountsError::InvalidCredentials);
        };

        let verified = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| AccountsError::Hashing)?;
        if !verified {
            return Err(AccountsError::InvalidCredentials);
        }

        let token = self.auth.issue(&user.id)?;
        Ok(AuthenticatedUser {
            user_id: user.id,
            token,
        })
    }

    /// Issue a reset token and dispatch it. Unknown addresses are a silent
    /// success so the endpoint does not leak which emails hold accounts.
    pub fn request_password_reset(&self, email: &str, now: DateTime<Utc>) -> Result<(), AccountsError> {
        let email = normalize_email(email)?;
        let Some(mut user) = self.users.fetch_by_email(&email)? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = Uuid::new_v4().to_string();
        user.reset_token = Some(ResetToken {
            token: token.clone(),
            expires_at: now + Duration::hours(RESET_TOKEN_VALIDITY_HOURS),
        });
        self.users.update(user.clone())?;

        send_best_effort(
            self.notifications.as_ref(),
            Notification::password_reset(&user.email, &token),
        );
        Ok(())
    }

    pub fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AccountsError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AccountsError::WeakPassword);
        }

        let Some(mut user) = self.users.fetch_by_reset_token(token)? else {
            return Err(AccountsError::InvalidResetToken);
        };

        let reset = user
            .reset_token
            .as_ref()
            .ok_or(AccountsError::InvalidResetToken)?;
        if reset.is_expired(now) {
            return Err(AccountsError::ExpiredResetToken);
        }

        user.password_hash =
            bcrypt::hash(new_password, bcrypt::DEFAULT_COST).map_err(|_| AccountsError::Hashing)?;
        user.reset_token = None;
        self.users.update(user)?;
        Ok(())
    }

    pub fn fetch(&self, id: &UserId) -> Result<Option<User>, AccountsError> {
        Ok(self.users.fetch(id)?)
    }
}

fn normalize_email(raw: &str) -> Result<String, AccountsError> {
    let email = raw.trim().to_ascii_lowercase();
    // Plausibility only; deliverability is the mail system's problem.
    let well_formed = email.contains('@') && email.contains('.') && !email.starts_with('@');
    if well_formed {
        Ok(email)
    } else {
        Err(AccountsError::InvalidEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{Notification, NotificationKind};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<HashMap<UserId, User>>,
    }

    impl UserRepository for MemoryUsers {
        fn insert(&self, user: User) -> Result<User, UserRepositoryError> {
            let mut guard = self.users.lock().expect("lock");
            if guard
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
            {
                return Err(UserRepositoryError::Conflict);
            }
            guard.insert(user.id.clone(), user.clone());
            Ok(user)
        }

        fn update(&self, user: User) -> Result<(), UserRepositoryError> {
            self.users
                .lock()
                .expect("lock")
                .insert(user.id.clone(), user);
            Ok(())
        }

        fn fetch(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
            Ok(self.users.lock().expect("lock").get(id).cloned())
        }

        fn fetch_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
            Ok(self
                .users
                .lock()
                .expect("lock")
                .values()
                .find(|user| user.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        fn fetch_by_reset_token(&self, token: &str) -> Result<Option<User>, UserRepositoryError> {
            Ok(self
                .users
                .lock()
                .expect("lock")
                .values()
                .find(|user| {
                    user.reset_token
                        .as_ref()
                        .is_some_and(|reset| reset.token == token)
                })
                .cloned())
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        events: Mutex<Vec<Notification>>,
    }

    impl RecordingSender {
        fn events(&self) -> Vec<Notification> {
            self.events.lock().expect("lock").clone()
        }
    }

    impl NotificationSender for RecordingSender {
        fn send(&self, notification: Notification) -> Result<(), crate::notifications::NotificationError> {
            self.events.lock().expect("lock").push(notification);
            Ok(())
        }
    }

    fn build_service() -> (
        AccountsService<MemoryUsers, RecordingSender>,
        Arc<MemoryUsers>,
        Arc<RecordingSender>,
    ) {
        let users = Arc::new(MemoryUsers::default());
        let sender = Arc::new(RecordingSender::default());
        let service = AccountsService::new(
            users.clone(),
            sender.clone(),
            JwtAuth::new("accounts-test-secret"),
        );
        (service, users, sender)
    }

    #[test]
    fn register_then_login_round_trips() {
        let (service, _, _) = build_service();
        let registered = service
            .register("Asha@Example.com", "long-enough-pw", Some("Asha".to_string()))
            .expect("registration succeeds");

        let logged_in = service
            .login("asha@example.com", "long-enough-pw")
            .expect("login succeeds");
        assert_eq!(logged_in.user_id, registered.user_id);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (service, _, _) = build_service();
        service
            .register("asha@example.com", "long-enough-pw", None)
            .expect("first registration succeeds");

        match service.register("ASHA@example.com", "another-long-pw", None) {
            Err(AccountsError::EmailTaken) => {}
            other => panic!("expected email conflict, got {other:?}"),
        }
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (service, _, _) = build_service();
        service
            .register("asha@example.com", "long-enough-pw", None)
            .expect("registration succeeds");

        match service.login("asha@example.com", "wrong-password") {
            Err(AccountsError::InvalidCredentials) => {}
            other => panic!("expected invalid credentials, got {other:?}"),
        }
    }

    #[test]
    fn short_password_is_rejected() {
        let (service, _, _) = build_service();
        match service.register("asha@example.com", "short", None) {
            Err(AccountsError::WeakPassword) => {}
            other => panic!("expected weak password rejection, got {other:?}"),
        }
    }

    #[test]
    fn password_reset_flow_rotates_the_hash() {
        let (service, users, sender) = build_service();
        service
            .register("asha@example.com", "long-enough-pw", None)
            .expect("registration succeeds");

        let now = Utc::now();
        service
            .request_password_reset("asha@example.com", now)
            .expect("reset request accepted");

        let events = sender.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, NotificationKind::PasswordReset);

        let token = users
            .fetch_by_email("asha@example.com")
            .expect("lookup works")
            .expect("user present")
            .reset_token
            .expect("token issued")
            .token;

        service
            .reset_password(&token, "brand-new-password", now)
            .expect("reset succeeds");
        service
            .login("asha@example.com", "brand-new-password")
            .expect("new password works");
        assert!(service.login("asha@example.com", "long-enough-pw").is_err());
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        let (service, users, _) = build_service();
        service
            .register("asha@example.com", "long-enough-pw", None)
            .expect("registration succeeds");

        let requested_at = Utc::now();
        service
            .request_password_reset("asha@example.com", requested_at)
            .expect("reset request accepted");
        let token = users
            .fetch_by_email("asha@example.com")
            .expect("lookup works")
            .expect("user present")
            .reset_token
            .expect("token issued")
            .token;

        let too_late = requested_at + Duration::hours(2);
        match service.reset_password(&token, "brand-new-password", too_late) {
            Err(AccountsError::ExpiredResetToken) => {}
            other => panic!("expected expired token rejection, got {other:?}"),
        }
    }

    #[test]
    fn unknown_email_reset_request_is_silent() {
        let (service, _, sender) = build_service();
        service
            .request_password_reset("ghost@example.com", Utc::now())
            .expect("silent success");
        assert!(sender.events().is_empty());
    }
}
