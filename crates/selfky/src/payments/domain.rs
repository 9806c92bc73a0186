use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::admissions::domain::{ApplicationId, UserId};

/// Identifier wrapper for ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

/// Terminal and in-flight states of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentState {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, PaymentState::Pending)
    }
}

/// One attempt in the append-style payment ledger. The ledger is the
/// authoritative source for "was money captured"; the application's embedded
/// summary is a mirror of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: u32,
    pub currency: String,
    pub status: PaymentState,
    pub receipt: String,
    pub note: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}
