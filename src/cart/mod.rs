//! Cart staging domain module
//!
//! A transient, time-limited pre-booking holding area. Cart entries never
//! commit inventory; they only feed the reservation engine.

mod model;
mod service;

pub use model::*;
pub use service::CartService;
