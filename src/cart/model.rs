//! Cart models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// How long a staged cart entry stays valid before the reservation engine
/// refuses to convert it into a hold.
pub const CART_TTL_MINUTES: i64 = 30;

/// One staged selection in a customer's cart
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CartItem {
    pub id: Uuid,
    pub customer_id: String,
    pub seat_category_id: i64,
    pub event_day_id: i64,
    pub quantity: i32,
    pub price_per_seat: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for staging a cart entry
#[derive(Debug, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub seat_category_id: i64,
    pub event_day_id: i64,
    #[validate(range(min = 1, max = 10))]
    pub quantity: i32,
}

/// Cart staging errors
#[derive(Error, Debug)]
pub enum CartError {
    #[error("cart item not found")]
    NotFound,

    #[error("seat category is not open for booking")]
    CategoryUnavailable,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
