use chrono::{DateTime, Utc};

use super::domain::{PaymentRecord, PaymentState};
use crate::admissions::domain::ApplicationId;

/// Errors raised by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("gateway order {order_id} already recorded")]
    DuplicateOrder { order_id: String },
    #[error("no ledger record for gateway order {order_id}")]
    NotFound { order_id: String },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Listing filter for the admin surface; `None` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub status: Option<PaymentState>,
}

impl PaymentFilter {
    pub fn matches(&self, record: &PaymentRecord) -> bool {
        self.status.map_or(true, |status| record.status == status)
    }
}

/// Append-style record of every payment attempt, keyed by the gateway order
/// id. Implementations enforce order-id uniqueness; the guard against a
/// second completed record per application lives in the admissions service,
/// which refuses to create a new order once one has completed.
pub trait PaymentLedger: Send + Sync {
    /// Insert a `Pending` record when a gateway order is created.
    fn record_order_created(&self, record: PaymentRecord) -> Result<PaymentRecord, LedgerError>;

    /// Move the `Pending` record matching `order_id` to `Completed`,
    /// stamping the captured payment id and timestamp. Redelivery with the
    /// same payment id returns the stored record unchanged. A callback for
    /// an unknown order returns `NotFound`; callers log it as an orphan.
    fn record_payment_verified(
        &self,
        order_id: &str,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<PaymentRecord, LedgerError>;

    /// Mark the record for `order_id` as `Failed`, storing the reason.
    fn record_failure(&self, order_id: &str, reason: &str) -> Result<PaymentRecord, LedgerError>;

    /// Mark the record for `order_id` as `Cancelled`.
    fn record_cancellation(&self, order_id: &str) -> Result<PaymentRecord, LedgerError>;

    fn find_by_order(&self, order_id: &str) -> Result<Option<PaymentRecord>, LedgerError>;

    /// The completed record for an application, if any. At most one exists
    /// when the order-creation guard has done its job; implementations
    /// return the earliest if drift ever produced more.
    fn completed_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<PaymentRecord>, LedgerError>;

    /// Every completed record, for reconciliation sweeps.
    fn all_completed(&self) -> Result<Vec<PaymentRecord>, LedgerError>;

    fn list(&self, filter: &PaymentFilter) -> Result<Vec<PaymentRecord>, LedgerError>;

    /// Pending records created at or before `cutoff`, candidates for the
    /// abandonment sweep.
    fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<PaymentRecord>, LedgerError>;
}
