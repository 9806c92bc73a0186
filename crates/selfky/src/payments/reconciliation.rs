//! Batch maintenance over the ledger/application pair.
//!
//! Reconciliation restores the invariant "an application's status reflects
//! the terminal state of its authoritative payment record" after webhook
//! misses or crashes between the two writes. It is idempotent and safe to
//! re-run; a second pass over consistent data repairs nothing. The sweep
//! closes out payment orders abandoned client-side.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{PaymentRecord, PaymentState};
use super::ledger::{LedgerError, PaymentLedger};
use crate::admissions::domain::{
    Application, ApplicationId, ApplicationStatus, PaymentProgress,
};
use crate::admissions::repository::{ApplicationRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A completed payment whose application was brought up to date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairedApplication {
    pub application_id: ApplicationId,
    pub gateway_order_id: String,
    pub previous_status: &'static str,
}

/// A completed payment pointing at no application. Requires manual
/// investigation; reconciliation never fabricates an application for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedPayment {
    pub payment_id: String,
    pub application_id: ApplicationId,
    pub gateway_order_id: String,
}

/// Operator-facing outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub examined: usize,
    pub consistent: usize,
    pub repaired: Vec<RepairedApplication>,
    pub orphaned: Vec<OrphanedPayment>,
}

impl ReconciliationReport {
    pub fn changed(&self) -> bool {
        !self.repaired.is_empty()
    }
}

/// Walk every completed ledger record and repair applications that do not
/// reflect it. The ledger is authoritative; amount and date are copied from
/// the payment record, never the reverse.
pub fn reconcile<L, R>(
    ledger: &L,
    applications: &R,
    now: DateTime<Utc>,
) -> Result<ReconciliationReport, ReconciliationError>
where
    L: PaymentLedger,
    R: ApplicationRepository,
{
    let completed = ledger.all_completed()?;
    let mut report = ReconciliationReport {
        examined: completed.len(),
        ..ReconciliationReport::default()
    };

    for payment in completed {
        let Some(mut application) = applications.fetch(&payment.application_id)? else {
            tracing::error!(
                payment_id = %payment.id.0,
                application_id = %payment.application_id.0,
                order_id = %payment.gateway_order_id,
                "orphaned payment: completed ledger record without an application"
            );
            report.orphaned.push(OrphanedPayment {
                payment_id: payment.id.0.clone(),
                application_id: payment.application_id.clone(),
                gateway_order_id: payment.gateway_order_id.clone(),
            });
            continue;
        };

        if application_reflects(&application, &payment) {
            report.consistent += 1;
            continue;
        }

        let previous_status = application.status.label();
        repair_application(&mut application, &payment, now);
        applications.update(application)?;

        tracing::info!(
            application_id = %payment.application_id.0,
            order_id = %payment.gateway_order_id,
            previous_status,
            "reconciliation repaired application from ledger"
        );
        report.repaired.push(RepairedApplication {
            application_id: payment.application_id.clone(),
            gateway_order_id: payment.gateway_order_id.clone(),
            previous_status,
        });
    }

    Ok(report)
}

fn application_reflects(application: &Application, payment: &PaymentRecord) -> bool {
    let status_ok = matches!(
        application.status,
        ApplicationStatus::PaymentCompleted | ApplicationStatus::AdmitCardGenerated
    );
    let summary = &application.payment;
    status_ok
        && summary.status == PaymentProgress::Completed
        && summary.amount == payment.amount
        && summary.transaction_id.as_deref() == transaction_id(payment)
        && summary.payment_date == payment.paid_at
}

fn transaction_id(payment: &PaymentRecord) -> Option<&str> {
    payment
        .gateway_payment_id
        .as_deref()
        .or(Some(payment.gateway_order_id.as_str()))
}

fn repair_application(application: &mut Application, payment: &PaymentRecord, now: DateTime<Utc>) {
    let transaction = transaction_id(payment).unwrap_or_default().to_string();
    let paid_at = payment.paid_at.unwrap_or(payment.created_at);

    if matches!(
        application.status,
        ApplicationStatus::PaymentCompleted | ApplicationStatus::AdmitCardGenerated
    ) {
        // Status already terminal-side; only the mirrored summary drifted.
        application.payment.status = PaymentProgress::Completed;
        application.payment.amount = payment.amount;
        application.payment.transaction_id = Some(transaction);
        application.payment.payment_date = Some(paid_at);
        application.updated_at = now;
        return;
    }

    // Single completion path shared with live verification.
    if let Err(err) =
        application.mark_payment_completed(transaction, paid_at, payment.amount, now)
    {
        // Unreachable with the current transition table; surface loudly if
        // the table ever tightens.
        tracing::error!(
            application_id = %application.id.0,
            %err,
            "reconciliation could not complete application"
        );
    }
}

/// Outcome of one abandonment sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub cancelled: Vec<String>,
}

/// Cancel pending orders created at or before `cutoff` (abandoned checkout
/// modals, closed tabs). Applications stay in `PaymentPending` for retry.
pub fn sweep_stale_orders<L, R>(
    ledger: &L,
    applications: &R,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<SweepReport, ReconciliationError>
where
    L: PaymentLedger,
    R: ApplicationRepository,
{
    let stale = ledger.stale_pending(cutoff)?;
    let mut report = SweepReport {
        examined: stale.len(),
        ..SweepReport::default()
    };

    for payment in stale {
        debug_assert_eq!(payment.status, PaymentState::Pending);
        ledger.record_cancellation(&payment.gateway_order_id)?;

        if let Some(mut application) = applications.fetch(&payment.application_id)? {
            // Don't disturb applications settled by a later attempt.
            if application.payment.status != PaymentProgress::Completed {
                if application
                    .mark_payment_unsettled(PaymentProgress::Cancelled, now)
                    .is_ok()
                {
                    applications.update(application)?;
                }
            }
        }

        tracing::info!(
            order_id = %payment.gateway_order_id,
            application_id = %payment.application_id.0,
            "swept abandoned payment order"
        );
        report.cancelled.push(payment.gateway_order_id);
    }

    Ok(report)
}
