use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Application, ApplicationId, ApplicationStatus, CourseType, UserId};

/// Storage abstraction so the service module can be exercised in isolation.
/// Implementations enforce the unique constraints the document database
/// carries in production: application id, application number, and one live
/// application per (user, course) pair.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn fetch_for_course(
        &self,
        user_id: &UserId,
        course: CourseType,
    ) -> Result<Option<Application>, RepositoryError>;
    fn for_user(&self, user_id: &UserId) -> Result<Vec<Application>, RepositoryError>;
    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Admin listing filter; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub course_type: Option<CourseType>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        self.status.map_or(true, |status| application.status == status)
            && self
                .course_type
                .map_or(true, |course| application.course_type == course)
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub application_number: String,
    pub course_type: &'static str,
    pub status: &'static str,
    pub fee_amount: u32,
    pub payment_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    pub admit_card_available: bool,
}

impl ApplicationStatusView {
    pub fn from_application(application: &Application) -> Self {
        Self {
            application_id: application.id.clone(),
            application_number: application.application_number.clone(),
            course_type: application.course_type.label(),
            status: application.status.label(),
            fee_amount: application.payment.amount,
            payment_status: application.payment.status.label(),
            transaction_id: application.payment.transaction_id.clone(),
            payment_date: application.payment.payment_date,
            admit_card_available: application.admit_card.is_some(),
        }
    }

}
