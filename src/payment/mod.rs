//! Payment domain module
//!
//! Contains the payment ledger models, gateway signature verification, and
//! the confirmation handler that resolves asynchronous gateway webhooks.

mod model;
mod service;
mod signature;

pub use model::*;
pub use service::PaymentService;
pub use signature::{compute_signature, verify_signature};
