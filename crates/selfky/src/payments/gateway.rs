use std::future::Future;

use serde::{Deserialize, Serialize};

/// Order-creation request handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub amount: u32,
    pub currency: String,
    pub receipt: String,
}

/// Gateway-issued order the applicant pays against.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: u32,
    pub currency: String,
}

/// Signed callback payload delivered after checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignedCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    Unconfigured,
    #[error("gateway transport failed: {0}")]
    Transport(String),
    #[error("gateway rejected the request: status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("gateway returned an unparseable response: {0}")]
    InvalidResponse(String),
}

/// Payment gateway seam. Order creation performs network I/O; signature
/// verification is a pure keyed-hash check and stays synchronous.
pub trait PaymentGateway: Send + Sync {
    fn create_order(
        &self,
        request: OrderRequest,
    ) -> impl Future<Output = Result<GatewayOrder, GatewayError>> + Send;

    fn verify_signature(&self, callback: &SignedCallback) -> Result<bool, GatewayError>;
}

/// Placeholder wired when no gateway credentials are configured. Keeps the
/// rest of the service operable; order creation surfaces 503.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGateway;

impl PaymentGateway for UnconfiguredGateway {
    async fn create_order(&self, _request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        Err(GatewayError::Unconfigured)
    }

    fn verify_signature(&self, _callback: &SignedCallback) -> Result<bool, GatewayError> {
        Err(GatewayError::Unconfigured)
    }
}
