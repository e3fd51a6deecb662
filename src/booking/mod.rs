//! Booking domain module
//!
//! Contains the booking ledger models and the reservation engine that
//! converts staged cart selections into time-bounded inventory holds.

mod model;
mod service;

pub use model::*;
pub use service::BookingService;
