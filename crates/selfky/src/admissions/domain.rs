use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for account owners, shared with the accounts module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Courses an applicant can apply for. One live application per
/// (user, course) pair is enforced by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    Bpharm,
    Mpharm,
}

impl CourseType {
    pub const fn label(self) -> &'static str {
        match self {
            CourseType::Bpharm => "bpharm",
            CourseType::Mpharm => "mpharm",
        }
    }

    /// Prefix used when minting application numbers, e.g. `BPH26-000042`.
    pub const fn number_prefix(self) -> &'static str {
        match self {
            CourseType::Bpharm => "BPH",
            CourseType::Mpharm => "MPH",
        }
    }
}

/// Canonical reservation category set. Submissions carrying anything else
/// fail deserialization; fees are never defaulted for an unknown category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    General,
    Obc,
    Ews,
    Sc,
    St,
    Pwd,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::General => "GENERAL",
            Category::Obc => "OBC",
            Category::Ews => "EWS",
            Category::Sc => "SC",
            Category::St => "ST",
            Category::Pwd => "PWD",
        }
    }
}

/// Applicant-provided identity details collected on the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub full_name: String,
    pub fathers_name: String,
    pub category: Category,
    pub date_of_birth: NaiveDate,
}

/// Storage keys for the uploaded photo and signature. The core never holds
/// bytes; object storage is an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRefs {
    pub photo_key: String,
    pub signature_key: String,
}

/// Lifecycle stage of an application. `AdmitCardGenerated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    PaymentPending,
    PaymentCompleted,
    AdmitCardGenerated,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::PaymentPending => "payment_pending",
            ApplicationStatus::PaymentCompleted => "payment_completed",
            ApplicationStatus::AdmitCardGenerated => "admit_card_generated",
        }
    }

    /// Transition table for the lifecycle machine. Re-entering
    /// `PaymentPending` is permitted so failed attempts can retry.
    /// `Submitted -> PaymentCompleted` covers a verified payment landing
    /// before the pending transition was persisted; reconciliation repairs
    /// through the same edge.
    pub fn can_become(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, PaymentPending)
                | (Submitted, PaymentCompleted)
                | (PaymentPending, PaymentPending)
                | (PaymentPending, PaymentCompleted)
                | (PaymentCompleted, AdmitCardGenerated)
        )
    }
}

/// Settlement state mirrored onto the application from the payment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProgress {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentProgress {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentProgress::Pending => "pending",
            PaymentProgress::Completed => "completed",
            PaymentProgress::Failed => "failed",
            PaymentProgress::Cancelled => "cancelled",
        }
    }
}

/// Denormalized payment summary kept on the application for cheap reads.
/// Written only together with the ledger or by reconciliation; the ledger
/// stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub amount: u32,
    pub status: PaymentProgress,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
}

impl PaymentSummary {
    pub fn pending(amount: u32) -> Self {
        Self {
            amount,
            status: PaymentProgress::Pending,
            transaction_id: None,
            payment_date: None,
        }
    }
}

/// Admit card metadata stamped once payment has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmitCard {
    pub roll_number: String,
    pub exam_date: NaiveDate,
    pub exam_time: String,
    pub exam_center: String,
    pub issued_at: DateTime<Utc>,
}

/// Inbound payload for creating an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub course_type: CourseType,
    pub personal_details: PersonalDetails,
    pub documents: DocumentRefs,
}

/// The application aggregate: one applicant's submission for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub application_number: String,
    pub user_id: UserId,
    pub course_type: CourseType,
    pub personal_details: PersonalDetails,
    pub documents: DocumentRefs,
    pub payment: PaymentSummary,
    pub admit_card: Option<AdmitCard>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raised when a lifecycle mutation is attempted out of order.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("application is {found} and cannot move to {wanted}")]
    InvalidTransition {
        found: &'static str,
        wanted: &'static str,
    },
}

impl Application {
    /// Enter `PaymentPending` when a gateway order is created. Re-entering
    /// the state is a no-op, not an error.
    pub fn transition_to_payment_pending(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status == ApplicationStatus::PaymentPending {
            return Ok(());
        }
        self.transition(ApplicationStatus::PaymentPending, now)
    }

    /// The single path that sets `status == PaymentCompleted` together with a
    /// completed payment summary. Reconciliation reuses it when repairing.
    pub fn mark_payment_completed(
        &mut self,
        transaction_id: String,
        paid_at: DateTime<Utc>,
        amount: u32,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        // Gateway callbacks can be redelivered well after the first
        // settlement, including after the admit card went out.
        if matches!(
            self.status,
            ApplicationStatus::PaymentCompleted | ApplicationStatus::AdmitCardGenerated
        ) && self.payment.transaction_id.as_deref() == Some(transaction_id.as_str())
        {
            return Ok(());
        }
        self.transition(ApplicationStatus::PaymentCompleted, now)?;
        self.payment = PaymentSummary {
            amount,
            status: PaymentProgress::Completed,
            transaction_id: Some(transaction_id),
            payment_date: Some(paid_at),
        };
        Ok(())
    }

    /// Record a failed or aborted attempt. The application stays in
    /// `PaymentPending` so the applicant can retry; the draft is not
    /// re-opened once the payment flow has started.
    pub fn mark_payment_unsettled(
        &mut self,
        progress: PaymentProgress,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        debug_assert!(matches!(
            progress,
            PaymentProgress::Failed | PaymentProgress::Cancelled
        ));
        self.transition(ApplicationStatus::PaymentPending, now)?;
        self.payment.status = progress;
        self.payment.transaction_id = None;
        self.payment.payment_date = None;
        Ok(())
    }

    /// Stamp the admit card and enter the terminal state.
    pub fn attach_admit_card(
        &mut self,
        card: AdmitCard,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.transition(ApplicationStatus::AdmitCardGenerated, now)?;
        self.admit_card = Some(card);
        Ok(())
    }

    fn transition(
        &mut self,
        next: ApplicationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_become(next) {
            return Err(TransitionError::InvalidTransition {
                found: self.status.label(),
                wanted: next.label(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
