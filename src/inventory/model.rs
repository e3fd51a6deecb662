//! Inventory models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use thiserror::Error;

/// Audit-log action recorded when a booking's held quantity is returned to
/// inventory. The UNIQUE (booking_id, action) constraint on the audit table
/// makes the restoration exactly-once.
pub const INVENTORY_RESTORED_ACTION: &str = "inventory_restored";

/// Remaining bookable quantity for one seat category on one event day.
///
/// `remaining_quantity` is the single source of truth for how many seats are
/// left: it is decremented when a hold is created and incremented when a hold
/// is released, and is never negative.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct SeatCategoryAvailability {
    pub id: i64,
    pub seat_category_id: i64,
    pub event_day_id: i64,
    pub unit_price: i64,
    pub remaining_quantity: i32,
    pub is_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// Inventory accounting errors
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("availability not configured for this category and day")]
    NotFound,

    #[error("seat category is disabled")]
    Disabled,

    #[error("insufficient inventory: {remaining} seats remaining")]
    Insufficient { remaining: i32 },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Query parameters for listing availability
#[derive(Debug, Deserialize)]
pub struct ListAvailabilityQuery {
    pub seat_category_id: Option<i64>,
    pub event_day_id: Option<i64>,
}
