//! Payment models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::booking::BookingStatus;

/// Fallback payment window when no booking deadline applies. A payment's
/// `expires_at` is never later than the owning booking's hold deadline.
pub const PAYMENT_WINDOW_MINUTES: i64 = 5;

/// Payment lifecycle status.
///
/// Forward-only: a failed or expired payment never transitions back to
/// success; a fresh booking/payment cycle is required instead.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

/// One gateway transaction attempt tied to one booking
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub status: PaymentStatus,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Processing status of one inbound webhook
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Processed,
    Failed,
}

/// Immutable audit record of an inbound gateway webhook
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PaymentNotificationRecord {
    pub id: i64,
    pub raw_payload: serde_json::Value,
    pub signature: String,
    pub signature_verified: bool,
    pub processing_status: NotificationStatus,
    pub error_message: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Inbound gateway webhook payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayNotification {
    pub gateway_payment_id: String,
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status_code: i32,
    pub signature: String,
}

/// Terminal outcome reported by the gateway.
///
/// Status codes: 2 = captured, 3 = failed, 4 = cancelled by customer.
/// Unknown codes are not mapped; the notification is recorded as failed
/// without touching payment or booking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOutcome {
    Success,
    Failed,
}

impl GatewayOutcome {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            2 => Some(GatewayOutcome::Success),
            3 | 4 => Some(GatewayOutcome::Failed),
            _ => None,
        }
    }
}

/// How a recorded notification was resolved. Both variants are acknowledged
/// with 2xx; the distinction exists for logging and tests.
#[derive(Debug, PartialEq, Eq)]
pub enum NotificationOutcome {
    Processed,
    Rejected(String),
}

/// Checkout initiation errors
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("booking not found")]
    BookingNotFound,

    #[error("booking is {0} and cannot be paid")]
    BookingNotPayable(BookingStatus),

    #[error("booking hold has expired")]
    HoldExpired,

    #[error("checkout already initiated for this booking")]
    AlreadyInitiated,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_outcome_mapping() {
        assert_eq!(GatewayOutcome::from_code(2), Some(GatewayOutcome::Success));
        assert_eq!(GatewayOutcome::from_code(3), Some(GatewayOutcome::Failed));
        assert_eq!(GatewayOutcome::from_code(4), Some(GatewayOutcome::Failed));
        assert_eq!(GatewayOutcome::from_code(0), None);
        assert_eq!(GatewayOutcome::from_code(99), None);
    }
}
