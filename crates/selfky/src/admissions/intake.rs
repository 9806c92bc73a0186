use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, PaymentSummary, UserId,
};
use super::fees;

/// Validation errors raised while turning a submission into an application.
/// Nothing is persisted when any of these fire.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("required document reference missing: {slot}")]
    MissingDocument { slot: &'static str },
    #[error("applicant name must not be blank")]
    BlankName,
    #[error("father's name must not be blank")]
    BlankFathersName,
    #[error("date of birth {found} is not in the past")]
    ImplausibleDateOfBirth { found: String },
}

/// Guard responsible for producing `Application` records from raw
/// submissions. Course and category arrive as enums, so the only work left
/// is presence checks and the fee stamp.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    /// Validate a submission and build the `Submitted` application with its
    /// pending payment summary priced from the fee schedule.
    pub fn application_from_submission(
        &self,
        user_id: UserId,
        submission: ApplicationSubmission,
        now: DateTime<Utc>,
    ) -> Result<Application, IntakeError> {
        if submission.documents.photo_key.trim().is_empty() {
            return Err(IntakeError::MissingDocument { slot: "photo" });
        }
        if submission.documents.signature_key.trim().is_empty() {
            return Err(IntakeError::MissingDocument { slot: "signature" });
        }
        if submission.personal_details.full_name.trim().is_empty() {
            return Err(IntakeError::BlankName);
        }
        if submission.personal_details.fathers_name.trim().is_empty() {
            return Err(IntakeError::BlankFathersName);
        }
        if submission.personal_details.date_of_birth >= now.date_naive() {
            return Err(IntakeError::ImplausibleDateOfBirth {
                found: submission.personal_details.date_of_birth.to_string(),
            });
        }

        let amount = fees::fee(submission.course_type, submission.personal_details.category);

        Ok(Application {
            id: ApplicationId("pending".to_string()),
            application_number: String::new(),
            user_id,
            course_type: submission.course_type,
            personal_details: submission.personal_details,
            documents: submission.documents,
            payment: PaymentSummary::pending(amount),
            admit_card: None,
            status: ApplicationStatus::Submitted,
            created_at: now,
            updated_at: now,
        })
    }
}
