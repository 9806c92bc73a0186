//! Outbound notification seam.
//!
//! Delivery (SMTP or otherwise) lives behind [`NotificationSender`] so state
//! transitions never depend on a mail server being reachable. Callers treat
//! sends as fire-and-forget: a failed send is logged and swallowed, never
//! propagated into the triggering operation.

use serde::{Deserialize, Serialize};

/// State transition a notification is keyed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationSubmitted,
    PaymentCompleted,
    AdmitCardReady,
    PasswordReset,
}

/// Rendered notification handed to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn application_submitted(recipient: &str, application_number: &str) -> Self {
        Self {
            kind: NotificationKind::ApplicationSubmitted,
            recipient: recipient.to_string(),
            subject: "Application received".to_string(),
            body: format!(
                "Your application {application_number} has been received. \
                 Complete the fee payment to proceed."
            ),
        }
    }

    pub fn payment_completed(recipient: &str, application_number: &str, amount: u32) -> Self {
        Self {
            kind: NotificationKind::PaymentCompleted,
            recipient: recipient.to_string(),
            subject: "Payment confirmed".to_string(),
            body: format!(
                "Payment of INR {amount} for application {application_number} was received."
            ),
        }
    }

    pub fn admit_card_ready(recipient: &str, application_number: &str, roll_number: &str) -> Self {
        Self {
            kind: NotificationKind::AdmitCardReady,
            recipient: recipient.to_string(),
            subject: "Admit card available".to_string(),
            body: format!(
                "The admit card for application {application_number} is ready. \
                 Roll number: {roll_number}."
            ),
        }
    }

    pub fn password_reset(recipient: &str, token: &str) -> Self {
        Self {
            kind: NotificationKind::PasswordReset,
            recipient: recipient.to_string(),
            subject: "Password reset requested".to_string(),
            body: format!("Use token {token} to reset your password. Valid for one hour."),
        }
    }
}

/// Transport error. Observed by logs only; never rolls back a transition.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outbound delivery hook (SMTP adapter, recording fake, ...).
pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Send and swallow: log delivery failures at warn and move on.
pub fn send_best_effort<N: NotificationSender>(sender: &N, notification: Notification) {
    let kind = notification.kind;
    if let Err(err) = sender.send(notification) {
        tracing::warn!(?kind, %err, "notification delivery failed; continuing");
    }
}
