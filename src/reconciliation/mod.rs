//! Reconciliation domain module
//!
//! The periodic safety net that keeps booking statuses, payment statuses and
//! seat inventory mutually consistent despite crashes, partial failures and
//! lost webhooks.

mod scheduler;
mod service;

pub use scheduler::start_scheduler;
pub use service::ReconciliationService;
