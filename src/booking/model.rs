//! Booking models and data structures

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::inventory::InventoryError;

/// How long a pending hold keeps seats reserved before it is allowed to
/// lapse and the reconciliation sweep returns them to inventory.
pub const HOLD_DURATION_MINUTES: i64 = 15;

/// Booking lifecycle status.
///
/// Transitions are forward-only: `pending` moves to exactly one of
/// `confirmed` (verified payment), `expired` (hold lapsed with no payment)
/// or `cancelled` (failed payment or explicit cancel). The three non-pending
/// states are terminal for this core.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }

    /// Terminal states are never re-mutated by the scheduler or handlers
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer's hold or confirmed purchase of N seats in one category on
/// one event day. While `status` is pending, `expires_at` is always set.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: String,
    pub seat_category_id: i64,
    pub event_day_id: i64,
    pub quantity: i32,
    pub total_price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Booking joined with display data for API responses
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BookingWithDetails {
    pub id: Uuid,
    pub customer_id: String,
    pub seat_category_id: i64,
    pub event_day_id: i64,
    pub quantity: i32,
    pub total_price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub shop_name: String,
    pub category_name: String,
    pub event_date: NaiveDate,
}

/// Request DTO for converting cart entries into holds
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingsRequest {
    #[validate(length(min = 1, max = 20))]
    pub cart_item_ids: Vec<Uuid>,
}

/// Query parameters for listing bookings
#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Reservation engine errors
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("insufficient inventory: {remaining} seats remaining")]
    InsufficientInventory { remaining: i32 },

    #[error("cart item has passed its staging expiration")]
    StaleCartItem,

    #[error("seat category is not open for booking")]
    CategoryUnavailable,

    #[error("cart item not found")]
    CartItemNotFound,

    #[error("booking not found")]
    NotFound,

    #[error("booking is already {0} and cannot be cancelled")]
    NotCancellable(BookingStatus),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<InventoryError> for BookingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Insufficient { remaining } => {
                BookingError::InsufficientInventory { remaining }
            }
            InventoryError::NotFound | InventoryError::Disabled => {
                BookingError::CategoryUnavailable
            }
            InventoryError::Database(e) => BookingError::Database(e),
        }
    }
}
