//! Core library for the Selfky admissions service.
//!
//! The crate owns the application lifecycle state machine, the payment
//! ledger, and the reconciliation procedure that keeps the two consistent.
//! Persistence, gateway transport, and notification delivery sit behind
//! traits so the service can be exercised end-to-end with in-memory
//! adapters.

pub mod accounts;
pub mod admissions;
pub mod config;
pub mod error;
pub mod notifications;
pub mod payments;
pub mod telemetry;
