use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The operational kill switch for admit-card issuance and download. One
/// versioned record, read at request time; not a state-machine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseState {
    pub released: bool,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

impl ReleaseState {
    pub fn withheld(at: DateTime<Utc>) -> Self {
        Self {
            released: false,
            version: 1,
            updated_at: at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReleaseGateError {
    #[error("release record unavailable: {0}")]
    Unavailable(String),
}

/// Store for the release record. Toggling bumps the version so operators can
/// audit flips.
pub trait ReleaseGate: Send + Sync {
    fn current(&self) -> Result<ReleaseState, ReleaseGateError>;
    fn set_released(&self, released: bool, at: DateTime<Utc>)
        -> Result<ReleaseState, ReleaseGateError>;
}
