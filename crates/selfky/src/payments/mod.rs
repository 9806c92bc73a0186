//! Payment ledger, gateway seam, and the maintenance procedures that keep
//! ledger and application state consistent.

pub mod domain;
pub mod gateway;
pub mod ledger;
pub mod razorpay;
pub mod reconciliation;

pub use domain::{PaymentId, PaymentRecord, PaymentState};
pub use gateway::{
    GatewayError, GatewayOrder, OrderRequest, PaymentGateway, SignedCallback, UnconfiguredGateway,
};
pub use ledger::{LedgerError, PaymentFilter, PaymentLedger};
pub use razorpay::RazorpayClient;
pub use reconciliation::{
    reconcile, sweep_stale_orders, OrphanedPayment, ReconciliationError, ReconciliationReport,
    RepairedApplication, SweepReport,
};
