//! Seat inventory domain module
//!
//! Holds the per (seat category, event day) availability counters and the
//! accounting rules that keep them consistent with the booking ledger.

mod model;
mod service;

pub use model::*;
pub use service::InventoryService;
