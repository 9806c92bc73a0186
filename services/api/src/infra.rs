use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use selfky::accounts::{User, UserId, UserRepository, UserRepositoryError};
use selfky::admissions::{
    AdmitCard, AdmitCardRenderer, Application, ApplicationFilter, ApplicationId,
    ApplicationRepository, CourseType, ReleaseGate, ReleaseGateError, ReleaseState, RenderError,
    RenderedDocument, RepositoryError,
};
use selfky::config::GatewayConfig;
use selfky::notifications::{Notification, NotificationError, NotificationSender};
use selfky::payments::{
    GatewayError, GatewayOrder, LedgerError, OrderRequest, PaymentFilter, PaymentGateway,
    PaymentLedger, PaymentRecord, PaymentState, RazorpayClient, SignedCallback,
    UnconfiguredGateway,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryApplicationRepository {
    records: Mutex<HashMap<ApplicationId, Application>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let duplicate_pair = guard.values().any(|existing| {
            existing.user_id == application.user_id
                && existing.course_type == application.course_type
        });
        let duplicate_number = guard
            .values()
            .any(|existing| existing.application_number == application.application_number);
        if guard.contains_key(&application.id) || duplicate_pair || duplicate_number {
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
pub(crate) struct InMemoryPaymentLedger {
    records: Mutex<Vec<PaymentRecord>>,
}

impl InMemoryPaymentLedger {
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

        // Captured money never regresses to failed/cancelled.
        if record.status != PaymentState::Completed {
            record.status = state;
            if let Some(reason) = reason {
                record.error_message = Some(reason.to_string());
            }
        }
        Ok(record.clone())
    }
}

impl PaymentLedger for InMemoryPaymentLedger {
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
            .filter(|record| record.status == PaymentState::Pending && record.created_at <= cutoff)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, user: User) -> Result<User, UserRepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
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
        let mut guard = self.users.lock().expect("user mutex poisoned");
        if guard.contains_key(&user.id) {
            guard.insert(user.id.clone(), user);
            Ok(())
        } else {
            Err(UserRepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn fetch_by_reset_token(&self, token: &str) -> Result<Option<User>, UserRepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
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

/// Delivery adapter used until an SMTP integration is wired: transitions are
/// observable in the logs and nothing blocks on a mail server.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationSender;

impl NotificationSender for LoggingNotificationSender {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        tracing::info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification dispatched"
        );
        Ok(())
    }
}

pub(crate) struct InMemoryReleaseGate {
    state: Mutex<ReleaseState>,
}

impl Default for InMemoryReleaseGate {
    fn default() -> Self {
        Self {
            state: Mutex::new(ReleaseState::withheld(Utc::now())),
        }
    }
}

impl ReleaseGate for InMemoryReleaseGate {
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

/// Plain-text stand-in for the PDF renderer integration.
#[derive(Default, Clone)]
pub(crate) struct PlainTextRenderer;

impl AdmitCardRenderer for PlainTextRenderer {
    fn render(
        &self,
        application: &Application,
        card: &AdmitCard,
    ) -> Result<RenderedDocument, RenderError> {
        let body = format!(
            "ADMIT CARD\n\
             Application: {}\n\
             Candidate: {}\n\
             Course: {}\n\
             Roll number: {}\n\
             Exam: {} at {}\n\
             Center: {}\n",
            application.application_number,
            application.personal_details.full_name,
            application.course_type.label(),
            card.roll_number,
            card.exam_date,
            card.exam_time,
            card.exam_center,
        );
        Ok(RenderedDocument {
            content_type: "text/plain; charset=utf-8",
            bytes: body.into_bytes(),
        })
    }
}

/// Gateway selection made at startup from configuration. Without
/// credentials the service still runs; order creation answers 503.
pub(crate) enum GatewayBackend {
    Razorpay(RazorpayClient),
    Unconfigured(UnconfiguredGateway),
}

impl GatewayBackend {
    pub(crate) fn from_config(config: Option<&GatewayConfig>) -> Self {
        match config {
            Some(config) => Self::Razorpay(RazorpayClient::new(config)),
            None => Self::Unconfigured(UnconfiguredGateway),
        }
    }
}

impl PaymentGateway for GatewayBackend {
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        match self {
            GatewayBackend::Razorpay(client) => client.create_order(request).await,
            GatewayBackend::Unconfigured(gateway) => gateway.create_order(request).await,
        }
    }

    fn verify_signature(&self, callback: &SignedCallback) -> Result<bool, GatewayError> {
        match self {
            GatewayBackend::Razorpay(client) => client.verify_signature(callback),
            GatewayBackend::Unconfigured(gateway) => gateway.verify_signature(callback),
        }
    }
}
