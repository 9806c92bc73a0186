use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::accounts::domain::{User, UserId};
use crate::accounts::repository::{UserRepository, UserRepositoryError};
use crate::admissions::domain::{
    Application, ApplicationId, ApplicationSubmission, Category, CourseType, DocumentRefs,
    PersonalDetails,
};
use crate::admissions::release::{ReleaseGate, ReleaseGateError, ReleaseState};
use crate::admissions::render::{AdmitCardRenderer, RenderError, RenderedDocument};
use crate::admissions::repository::{
    ApplicationFilter, ApplicationRepository, RepositoryError,
};
use crate::admissions::service::AdmissionsService;
use crate::config::ExamDefaults;
use crate::notifications::{Notification, NotificationError, NotificationSender};
use crate::payments::domain::{PaymentRecord, PaymentState};
use crate::payments::gateway::{
    GatewayError, GatewayOrder, OrderRequest, PaymentGateway, SignedCallback,
};
use crate::payments::ledger::{LedgerError, PaymentFilter, PaymentLedger};

pub(super) fn personal_details() -> PersonalDetails {
    PersonalDetails {
        full_name: "Asha Verma".to_string(),
        fathers_name: "Ramesh Verma".to_string(),
        category: Category::General,
        date_of_birth: NaiveDate::from_ymd_opt(2003, 4, 18).expect("valid date"),
    }
}

pub(super) fn documents() -> DocumentRefs {
    DocumentRefs {
        photo_key: "uploads/user-1/photo.jpg".to_string(),
        signature_key: "uploads/user-1/signature.jpg".to_string(),
    }
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        course_type: CourseType::Bpharm,
        personal_details: personal_details(),
        documents: documents(),
    }
}

pub(super) fn exam_defaults() -> ExamDefaults {
    ExamDefaults {
        center: "Main Campus, Block A".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date"),
        time: "10:00 AM".to_string(),
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<ApplicationId, Application>>,
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let duplicate_pair = guard.values().any(|existing| {
            existing.user_id == application.user_id
                && existing.course_type == application.course_type
        });
        if guard.contains_key(&application.id) || duplicate_pair {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            guard.insert(application.id.clone(), application);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_for_course(
        &self,
        user_id: &UserId,
        course: CourseType,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|application| {
                &application.user_id == user_id && application.course_type == course
            })
            .cloned())
    }

    fn for_user(&self, user_id: &UserId) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| &application.user_id == user_id)
            .cloned()
            .collect())
    }

    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    records: Mutex<Vec<PaymentRecord>>,
}

impl MemoryLedger {
    pub(super) fn records(&self) -> Vec<PaymentRecord> {
        self.records.lock().expect("ledger mutex poisoned").clone()
    }

    pub(super) fn push_raw(&self, record: PaymentRecord) {
        self.records
            .lock()
            .expect("ledger mutex poisoned")
            .push(record);
    }
}

impl PaymentLedger for MemoryLedger {
    fn record_order_created(&self, record: PaymentRecord) -> Result<PaymentRecord, LedgerError> {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.gateway_order_id == record.gateway_order_id)
        {
            return Err(LedgerError::DuplicateOrder {
                order_id: record.gateway_order_id,
            });
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn record_payment_verified(
        &self,
        order_id: &str,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<PaymentRecord, LedgerError> {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| record.gateway_order_id == order_id)
            .ok_or_else(|| LedgerError::NotFound {
                order_id: order_id.to_string(),
            })?;

        if record.status != PaymentState::Completed {
            record.status = PaymentState::Completed;
            record.gateway_payment_id = Some(payment_id.to_string());
            record.paid_at = Some(paid_at);
            record.error_message = None;
        }
        Ok(record.clone())
    }

    fn record_failure(&self, order_id: &str, reason: &str) -> Result<PaymentRecord, LedgerError> {
        self.settle(order_id, PaymentState::Failed, Some(reason))
    }

    fn record_cancellation(&self, order_id: &str) -> Result<PaymentRecord, LedgerError> {
        self.settle(order_id, PaymentState::Cancelled, None)
    }

    fn find_by_order(&self, order_id: &str) -> Result<Option<PaymentRecord>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| record.gateway_order_id == order_id)
            .cloned())
    }

    fn completed_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<PaymentRecord>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| {
                &record.application_id == application_id
                    && record.status == PaymentState::Completed
            })
            .min_by_key(|record| record.created_at)
            .cloned())
    }

    fn all_completed(&self) -> Result<Vec<PaymentRecord>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.status == PaymentState::Completed)
            .cloned()
            .collect())
    }

    fn list(&self, filter: &PaymentFilter) -> Result<Vec<PaymentRecord>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<PaymentRecord>, LedgerError> {
        let guard = self.records.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| {
                record.status == PaymentState::Pending && record.created_at <= cutoff
            })
            .cloned()
            .collect())
    }
}

impl MemoryLedger {
    fn settle(
        &self,
        order_id: &str,
        state: PaymentState,
        reason: Option<&str>,
    ) -> Result<PaymentRecord, LedgerError> {
        let mut guard = self.records.lock().expect("ledger mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| record.gateway_order_id == order_id)
            .ok_or_else(|| LedgerError::NotFound {
                order_id: order_id.to_string(),
            })?;

        // Captured money never regresses; late failure reports lose.
        if record.status != PaymentState::Completed {
            record.status = state;
            if let Some(reason) = reason {
                record.error_message = Some(reason.to_string());
            }
        }
        Ok(record.clone())
    }
}

/// Deterministic gateway: order ids are sequential and a signature is valid
/// when it equals [`MockGateway::signature_for`].
#[derive(Default)]
pub(super) struct MockGateway {
    counter: AtomicU64,
}

impl MockGateway {
    pub(super) fn signature_for(order_id: &str, payment_id: &str) -> String {
        format!("sig({order_id}|{payment_id})")
    }
}

impl PaymentGateway for MockGateway {
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(GatewayOrder {
            order_id: format!("order_{sequence:04}"),
            amount: request.amount,
            currency: request.currency,
        })
    }

    fn verify_signature(&self, callback: &SignedCallback) -> Result<bool, GatewayError> {
        Ok(callback.signature
            == Self::signature_for(&callback.order_id, &callback.payment_id))
    }
}

#[derive(Default)]
pub(super) struct MemoryUsers {
    users: Mutex<HashMap<UserId, User>>,
}

impl UserRepository for MemoryUsers {
    fn insert(&self, user: User) -> Result<User, UserRepositoryError> {
        let mut guard = self.users.lock().expect("users mutex poisoned");
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
        let mut guard = self.users.lock().expect("users mutex poisoned");
        if guard.contains_key(&user.id) {
            guard.insert(user.id.clone(), user);
            Ok(())
        } else {
            Err(UserRepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("users mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("users mutex poisoned");
        Ok(guard
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn fetch_by_reset_token(&self, token: &str) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("users mutex poisoned");
        Ok(guard
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
pub(super) struct RecordingNotifications {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationSender for RecordingNotifications {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Sender that always fails, for the fire-and-forget contract.
pub(super) struct FailingNotifications;

impl NotificationSender for FailingNotifications {
    fn send(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

pub(super) struct MemoryReleaseGate {
    state: Mutex<ReleaseState>,
}

impl Default for MemoryReleaseGate {
    fn default() -> Self {
        Self {
            state: Mutex::new(ReleaseState::withheld(
                Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            )),
        }
    }
}

impl ReleaseGate for MemoryReleaseGate {
    fn current(&self) -> Result<ReleaseState, ReleaseGateError> {
        Ok(self.state.lock().expect("release mutex poisoned").clone())
    }

    fn set_released(
        &self,
        released: bool,
        at: DateTime<Utc>,
    ) -> Result<ReleaseState, ReleaseGateError> {
        let mut guard = self.state.lock().expect("release mutex poisoned");
        guard.released = released;
        guard.version += 1;
        guard.updated_at = at;
        Ok(guard.clone())
    }
}

pub(super) struct TextRenderer;

impl AdmitCardRenderer for TextRenderer {
    fn render(
        &self,
        application: &Application,
        card: &crate::admissions::domain::AdmitCard,
    ) -> Result<RenderedDocument, RenderError> {
        Ok(RenderedDocument {
            content_type: "text/plain",
            bytes: format!(
                "{} / {}",
                application.application_number, card.roll_number
            )
            .into_bytes(),
        })
    }
}

pub(super) type TestService =
    AdmissionsService<MemoryRepository, MemoryLedger, MockGateway, MemoryUsers, RecordingNotifications>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) ledger: Arc<MemoryLedger>,
    pub(super) users: Arc<MemoryUsers>,
    pub(super) notifications: Arc<RecordingNotifications>,
    pub(super) release: Arc<MemoryReleaseGate>,
    pub(super) user_id: UserId,
}

pub(super) fn seeded_user(users: &MemoryUsers, email: &str) -> UserId {
    let id = UserId(format!("user-{email}"));
    users
        .insert(User {
            id: id.clone(),
            email: email.to_string(),
            password_hash: "$2b$12$hash".to_string(),
            name: Some("Test Applicant".to_string()),
            reset_token: None,
            created_at: Utc::now(),
        })
        .expect("seed user inserts");
    id
}

pub(super) fn build_harness() -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let ledger = Arc::new(MemoryLedger::default());
    let gateway = Arc::new(MockGateway::default());
    let users = Arc::new(MemoryUsers::default());
    let notifications = Arc::new(RecordingNotifications::default());
    let release = Arc::new(MemoryReleaseGate::default());

    let user_id = seeded_user(&users, "applicant@example.com");

    let service = Arc::new(AdmissionsService::new(
        repository.clone(),
        ledger.clone(),
        gateway,
        users.clone(),
        notifications.clone(),
        release.clone(),
        Arc::new(TextRenderer),
        exam_defaults(),
    ));

    Harness {
        service,
        repository,
        ledger,
        users,
        notifications,
        release,
        user_id,
    }
}
