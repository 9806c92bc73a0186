use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::domain::{
    AdmitCard, Application, ApplicationId, ApplicationStatus, ApplicationSubmission,
    PaymentProgress, TransitionError, UserId,
};
use super::fees;
use super::intake::{IntakeError, IntakeGuard};
use super::release::{ReleaseGate, ReleaseGateError, ReleaseState};
use super::render::{AdmitCardRenderer, RenderError, RenderedDocument};
use super::repository::{ApplicationFilter, ApplicationRepository, RepositoryError};
use crate::accounts::repository::{UserRepository, UserRepositoryError};
use crate::config::ExamDefaults;
use crate::notifications::{send_best_effort, Notification, NotificationSender};
use crate::payments::domain::{PaymentId, PaymentRecord, PaymentState};
use crate::payments::gateway::{GatewayError, OrderRequest, PaymentGateway, SignedCallback};
use crate::payments::ledger::{LedgerError, PaymentFilter, PaymentLedger};
use crate::payments::reconciliation::{
    self, ReconciliationError, ReconciliationReport, SweepReport,
};

/// Error raised by the admissions service. Routers map these onto HTTP
/// statuses; see `router.rs`.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionsServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error("an application for this course already exists")]
    AlreadyApplied,
    #[error("payment already completed for this application")]
    AlreadyPaid,
    #[error("payment signature verification failed")]
    InvalidSignature,
    #[error("admit cards have not been released yet")]
    AdmitCardWithheld,
    #[error("admit card unavailable while the application is {status}")]
    AdmitCardUnavailable { status: &'static str },
    #[error("application not found")]
    ApplicationNotFound,
    #[error("account not found")]
    UserNotFound,
    #[error("no payment order matching {order_id}")]
    OrderNotFound { order_id: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Users(#[from] UserRepositoryError),
    #[error(transparent)]
    Release(#[from] ReleaseGateError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
}

/// Checkout payload returned when a gateway order has been opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOrderView {
    pub application_id: ApplicationId,
    pub gateway_order_id: String,
    pub amount: u32,
    pub currency: String,
    pub receipt: String,
}

/// Service composing the intake guard, application repository, payment
/// ledger, gateway, account store, and notification seam.
pub struct AdmissionsService<R, L, G, U, N> {
    repository: Arc<R>,
    ledger: Arc<L>,
    gateway: Arc<G>,
    users: Arc<U>,
    notifications: Arc<N>,
    release: Arc<dyn ReleaseGate>,
    renderer: Arc<dyn AdmitCardRenderer>,
    guard: IntakeGuard,
    exam: ExamDefaults,
    sequence: AtomicU64,
}

impl<R, L, G, U, N> AdmissionsService<R, L, G, U, N>
where
    R: ApplicationRepository + 'static,
    L: PaymentLedger + 'static,
    G: PaymentGateway + 'static,
    U: UserRepository + 'static,
    N: NotificationSender + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<R>,
        ledger: Arc<L>,
        gateway: Arc<G>,
        users: Arc<U>,
        notifications: Arc<N>,
        release: Arc<dyn ReleaseGate>,
        renderer: Arc<dyn AdmitCardRenderer>,
        exam: ExamDefaults,
    ) -> Self {
        Self {
            repository,
            ledger,
            gateway,
            users,
            notifications,
            release,
            renderer,
            guard: IntakeGuard,
            exam,
            sequence: AtomicU64::new(1),
        }
    }

    /// Validate and store a new application, then send the submission
    /// receipt. A failed receipt send never fails the submission.
    pub fn submit(
        &self,
        user_id: &UserId,
        submission: ApplicationSubmission,
    ) -> Result<Application, AdmissionsServiceError> {
        let user = self
            .users
            .fetch(user_id)?
            .ok_or(AdmissionsServiceError::UserNotFound)?;

        if self
            .repository
            .fetch_for_course(user_id, submission.course_type)?
            .is_some()
        {
            return Err(AdmissionsServiceError::AlreadyApplied);
        }

        let now = Utc::now();
        let mut application =
            self.guard
                .application_from_submission(user_id.clone(), submission, now)?;
        application.id = ApplicationId(Uuid::new_v4().to_string());
        application.application_number = self.next_application_number(application.course_type, now);

        let stored = match self.repository.insert(application) {
            Ok(application) => application,
            Err(RepositoryError::Conflict) => return Err(AdmissionsServiceError::AlreadyApplied),
            Err(other) => return Err(other.into()),
        };

        send_best_effort(
            self.notifications.as_ref(),
            Notification::application_submitted(&user.email, &stored.application_number),
        );
        Ok(stored)
    }

    pub fn my_applications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Application>, AdmissionsServiceError> {
        Ok(self.repository.for_user(user_id)?)
    }

    /// Fetch one application, hiding other users' records behind not-found.
    pub fn get_application(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<Application, AdmissionsServiceError> {
        let application = self
            .repository
            .fetch(application_id)?
            .ok_or(AdmissionsServiceError::ApplicationNotFound)?;
        if &application.user_id != user_id {
            return Err(AdmissionsServiceError::ApplicationNotFound);
        }
        Ok(application)
    }

    /// Open a gateway order for the application fee and record it in the
    /// ledger. Re-entering `PaymentPending` after a failed attempt is
    /// allowed; paying twice is not.
    pub async fn create_payment_order(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<PaymentOrderView, AdmissionsServiceError> {
        let mut application = self.get_application(user_id, application_id)?;

        if application.payment.status == PaymentProgress::Completed
            || self
                .ledger
                .completed_for_application(application_id)?
                .is_some()
        {
            return Err(AdmissionsServiceError::AlreadyPaid);
        }

        // The one fee schedule prices the order; the amount stamped at
        // intake came from the same table.
        let amount = fees::fee(
            application.course_type,
            application.personal_details.category,
        );
        let receipt = format!(
            "rcpt-{}-{}",
            application.application_number,
            Uuid::new_v4().simple()
        );

        let order = self
            .gateway
            .create_order(OrderRequest {
                amount,
                currency: fees::CURRENCY.to_string(),
                receipt: receipt.clone(),
            })
            .await?;

        let now = Utc::now();
        self.ledger.record_order_created(PaymentRecord {
            id: PaymentId(Uuid::new_v4().to_string()),
            application_id: application.id.clone(),
            user_id: user_id.clone(),
            gateway_order_id: order.order_id.clone(),
            gateway_payment_id: None,
            amount,
            currency: order.currency.clone(),
            status: PaymentState::Pending,
            receipt: receipt.clone(),
            note: None,
            error_message: None,
            created_at: now,
            paid_at: None,
        })?;

        application.transition_to_payment_pending(now)?;
        application.payment.status = PaymentProgress::Pending;
        self.repository.update(application.clone())?;

        Ok(PaymentOrderView {
            application_id: application.id,
            gateway_order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            receipt,
        })
    }

    /// Settle a signed gateway callback: ledger first, application second,
    /// both in the same logical operation. Idempotent under redelivery.
    pub fn verify_payment(
        &self,
        callback: &SignedCallback,
    ) -> Result<Application, AdmissionsServiceError> {
        let valid = self.gateway.verify_signature(callback)?;
        if !valid {
            return Err(AdmissionsServiceError::InvalidSignature);
        }

        let now = Utc::now();
        let payment = match self.ledger.record_payment_verified(
            &callback.order_id,
            &callback.payment_id,
            now,
        ) {
            Ok(payment) => payment,
            Err(LedgerError::NotFound { order_id }) => {
                // A signature-valid callback with no matching order must be
                // surfaced, not dropped: this is how payments orphan.
                tracing::error!(
                    %order_id,
                    payment_id = %callback.payment_id,
                    "verified callback without a matching ledger record"
                );
                return Err(AdmissionsServiceError::OrderNotFound { order_id });
            }
            Err(other) => return Err(other.into()),
        };

        let Some(mut application) = self.repository.fetch(&payment.application_id)? else {
            tracing::error!(
                application_id = %payment.application_id.0,
                order_id = %payment.gateway_order_id,
                "completed payment references a missing application"
            );
            return Err(AdmissionsServiceError::ApplicationNotFound);
        };

        application.mark_payment_completed(
            callback.payment_id.clone(),
            payment.paid_at.unwrap_or(now),
            payment.amount,
            now,
        )?;
        self.repository.update(application.clone())?;

        if let Ok(Some(user)) = self.users.fetch(&application.user_id) {
            send_best_effort(
                self.notifications.as_ref(),
                Notification::payment_completed(
                    &user.email,
                    &application.application_number,
                    payment.amount,
                ),
            );
        }

        Ok(application)
    }

    /// Record a failed attempt reported by the gateway or the client. The
    /// application stays in `PaymentPending` for retry.
    pub fn report_payment_failure(
        &self,
        order_id: &str,
        reason: &str,
    ) -> Result<(), AdmissionsServiceError> {
        let record = match self.ledger.record_failure(order_id, reason) {
            Ok(record) => record,
            Err(LedgerError::NotFound { order_id }) => {
                return Err(AdmissionsServiceError::OrderNotFound { order_id })
            }
            Err(other) => return Err(other.into()),
        };
        self.mirror_unsettled(&record, PaymentProgress::Failed)
    }

    /// Record a user-aborted attempt (dismissed checkout, closed tab).
    pub fn cancel_payment(&self, order_id: &str) -> Result<(), AdmissionsServiceError> {
        let record = match self.ledger.record_cancellation(order_id) {
            Ok(record) => record,
            Err(LedgerError::NotFound { order_id }) => {
                return Err(AdmissionsServiceError::OrderNotFound { order_id })
            }
            Err(other) => return Err(other.into()),
        };
        self.mirror_unsettled(&record, PaymentProgress::Cancelled)
    }

    fn mirror_unsettled(
        &self,
        record: &PaymentRecord,
        progress: PaymentProgress,
    ) -> Result<(), AdmissionsServiceError> {
        // A completed ledger record never regresses; the attempt being
        // reported lost the race.
        if record.status == PaymentState::Completed {
            return Ok(());
        }

        if let Some(mut application) = self.repository.fetch(&record.application_id)? {
            if application.payment.status != PaymentProgress::Completed {
                application.mark_payment_unsettled(progress, Utc::now())?;
                self.repository.update(application)?;
            }
        }
        Ok(())
    }

    /// Return the admit card, issuing it on first request. Issuance demands
    /// a completed payment and the operator release toggle.
    pub fn admit_card(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<(Application, AdmitCard), AdmissionsServiceError> {
        let mut application = self.get_application(user_id, application_id)?;

        let release = self.release.current()?;
        if !release.released {
            return Err(AdmissionsServiceError::AdmitCardWithheld);
        }

        if let Some(card) = application.admit_card.clone() {
            return Ok((application, card));
        }

        if application.status != ApplicationStatus::PaymentCompleted {
            return Err(AdmissionsServiceError::AdmitCardUnavailable {
                status: application.status.label(),
            });
        }

        let now = Utc::now();
        let card = AdmitCard {
            roll_number: self.roll_number(&application),
            exam_date: self.exam.date,
            exam_time: self.exam.time.clone(),
            exam_center: self.exam.center.clone(),
            issued_at: now,
        };
        application.attach_admit_card(card.clone(), now)?;
        self.repository.update(application.clone())?;

        if let Ok(Some(user)) = self.users.fetch(&application.user_id) {
            send_best_effort(
                self.notifications.as_ref(),
                Notification::admit_card_ready(
                    &user.email,
                    &application.application_number,
                    &card.roll_number,
                ),
            );
        }

        Ok((application, card))
    }

    /// Render the admit card through the document seam.
    pub fn render_admit_card(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<RenderedDocument, AdmissionsServiceError> {
        let (application, card) = self.admit_card(user_id, application_id)?;
        Ok(self.renderer.render(&application, &card)?)
    }

    /// Idempotent ledger/application repair pass. See
    /// `payments::reconciliation`.
    pub fn reconcile(&self) -> Result<ReconciliationReport, AdmissionsServiceError> {
        Ok(reconciliation::reconcile(
            self.ledger.as_ref(),
            self.repository.as_ref(),
            Utc::now(),
        )?)
    }

    /// Cancel pending orders older than `max_age_hours`.
    pub fn sweep_stale_orders(
        &self,
        max_age_hours: i64,
    ) -> Result<SweepReport, AdmissionsServiceError> {
        let now = Utc::now();
        let cutoff = now - Duration::hours(max_age_hours);
        Ok(reconciliation::sweep_stale_orders(
            self.ledger.as_ref(),
            self.repository.as_ref(),
            cutoff,
            now,
        )?)
    }

    pub fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, AdmissionsServiceError> {
        Ok(self.repository.list(filter)?)
    }

    pub fn list_payments(
        &self,
        filter: &PaymentFilter,
    ) -> Result<Vec<PaymentRecord>, AdmissionsServiceError> {
        Ok(self.ledger.list(filter)?)
    }

    pub fn release_state(&self) -> Result<ReleaseState, AdmissionsServiceError> {
        Ok(self.release.current()?)
    }

    pub fn set_release(&self, released: bool) -> Result<ReleaseState, AdmissionsServiceError> {
        let state = self.release.set_released(released, Utc::now())?;
        tracing::info!(released, version = state.version, "admit card release toggled");
        Ok(state)
    }

    fn next_application_number(
        &self,
        course: super::domain::CourseType,
        now: DateTime<Utc>,
    ) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}{:02}-{:06}",
            course.number_prefix(),
            now.year() % 100,
            sequence
        )
    }

    fn roll_number(&self, application: &Application) -> String {
        // Derived from the application number so re-issuance stays stable.
        let digits: String = application
            .application_number
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        format!("R{digits}")
    }
}
