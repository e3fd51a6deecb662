//! Payment service layer - checkout initiation and webhook confirmation
//!
//! The webhook handler is written to be idempotent and to always succeed
//! from the gateway's point of view once the notification is durably
//! recorded: gateways retry on non-2xx, and retry storms help nobody.
//! Spoofed or unmatched notifications are absorbed into the audit trail
//! instead of being rejected loudly.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::payment::signature::verify_signature;
use crate::payment::{
    GatewayNotification, GatewayOutcome, NotificationOutcome, NotificationStatus, Payment,
    PaymentError, PaymentStatus, PAYMENT_WINDOW_MINUTES,
};

/// Payment service for the gateway transaction lifecycle
pub struct PaymentService {
    db_pool: PgPool,
    webhook_secret: String,
}

impl PaymentService {
    /// Create new payment service instance
    pub fn new(db_pool: PgPool, webhook_secret: String) -> Self {
        Self {
            db_pool,
            webhook_secret,
        }
    }

    /// Create the pending payment row paired with a booking hold.
    ///
    /// The payment deadline is kept synchronized with the hold deadline:
    /// never later than the booking's `expires_at`, defaulting to a short
    /// fixed window when the hold allows more time than the gateway does.
    pub async fn initiate_checkout(
        &self,
        customer_id: &str,
        booking_id: Uuid,
    ) -> Result<Payment, PaymentError> {
        let mut tx = self.db_pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE id = $1 AND customer_id = $2 FOR UPDATE",
        )
        .bind(booking_id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PaymentError::BookingNotFound)?;

        if booking.status != BookingStatus::Pending {
            return Err(PaymentError::BookingNotPayable(booking.status));
        }

        let now = Utc::now();
        let hold_deadline = match booking.expires_at {
            Some(deadline) if deadline > now => deadline,
            _ => return Err(PaymentError::HoldExpired),
        };

        let existing = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM payments WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(PaymentError::AlreadyInitiated);
        }

        let expires_at = hold_deadline.min(now + Duration::minutes(PAYMENT_WINDOW_MINUTES));
        let gateway_order_id = format!("order_{}", Uuid::new_v4().simple());

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, booking_id, amount, status, gateway_order_id,
                expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(booking.total_price)
        .bind(PaymentStatus::Pending)
        .bind(&gateway_order_id)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            booking_id = %booking_id,
            gateway_order_id = %gateway_order_id,
            "checkout initiated"
        );

        Ok(payment)
    }

    /// Resolve a payment's outcome from an asynchronous gateway webhook.
    ///
    /// The notification is persisted before anything else; every later
    /// failure is recorded on that row and absorbed, so the caller can ack
    /// 2xx. Only a failure to durably record the notification itself
    /// propagates as an error.
    pub async fn handle_notification(
        &self,
        notification: GatewayNotification,
    ) -> Result<NotificationOutcome, sqlx::Error> {
        let (note_id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO payment_notifications (raw_payload, signature, processing_status)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(serde_json::to_value(&notification).unwrap_or_default())
        .bind(&notification.signature)
        .bind(NotificationStatus::Pending)
        .fetch_one(&self.db_pool)
        .await?;

        let verified = verify_signature(
            &self.webhook_secret,
            &notification.gateway_order_id,
            &notification.gateway_payment_id,
            &notification.signature,
        );

        sqlx::query("UPDATE payment_notifications SET signature_verified = $1 WHERE id = $2")
            .bind(verified)
            .bind(note_id)
            .execute(&self.db_pool)
            .await?;

        if !verified {
            tracing::warn!(
                gateway_order_id = %notification.gateway_order_id,
                "webhook signature verification failed"
            );
            self.mark_notification(note_id, NotificationStatus::Failed, Some("signature mismatch"))
                .await?;
            return Ok(NotificationOutcome::Rejected("signature mismatch".into()));
        }

        match self.apply_notification(&notification).await {
            Ok(()) => {
                self.mark_notification(note_id, NotificationStatus::Processed, None)
                    .await?;
                Ok(NotificationOutcome::Processed)
            }
            Err(e) => {
                tracing::warn!(
                    gateway_order_id = %notification.gateway_order_id,
                    error = %e,
                    "webhook processing failed"
                );
                self.mark_notification(note_id, NotificationStatus::Failed, Some(&e.to_string()))
                    .await?;
                Ok(NotificationOutcome::Rejected(e.to_string()))
            }
        }
    }

    /// Apply a verified notification to the payment and booking ledgers.
    ///
    /// Status guards make this idempotent: a retry of an already-applied
    /// notification matches zero rows and changes nothing, and a late
    /// success can never resurrect a failed payment.
    async fn apply_notification(&self, notification: &GatewayNotification) -> Result<()> {
        let outcome = GatewayOutcome::from_code(notification.status_code)
            .ok_or_else(|| anyhow!("unknown gateway status code {}", notification.status_code))?;

        let mut tx = self.db_pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE gateway_order_id = $1 FOR UPDATE",
        )
        .bind(&notification.gateway_order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            anyhow!(
                "unmatched payment for gateway order {}",
                notification.gateway_order_id
            )
        })?;

        if notification.amount != payment.amount {
            tracing::warn!(
                payment_id = %payment.id,
                expected = payment.amount,
                reported = notification.amount,
                "gateway reported a different amount than the payment ledger"
            );
        }

        match outcome {
            GatewayOutcome::Success => {
                let updated = sqlx::query(
                    r#"
                    UPDATE payments
                    SET status = $1, gateway_payment_id = $2, updated_at = NOW()
                    WHERE id = $3 AND status = $4
                    "#,
                )
                .bind(PaymentStatus::Success)
                .bind(&notification.gateway_payment_id)
                .bind(payment.id)
                .bind(PaymentStatus::Pending)
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if updated == 1 {
                    let confirmed = sqlx::query(
                        "UPDATE bookings SET status = $1 WHERE id = $2 AND status = $3",
                    )
                    .bind(BookingStatus::Confirmed)
                    .bind(payment.booking_id)
                    .bind(BookingStatus::Pending)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

                    if confirmed == 0 {
                        let (booking_status,) = sqlx::query_as::<_, (BookingStatus,)>(
                            "SELECT status FROM bookings WHERE id = $1",
                        )
                        .bind(payment.booking_id)
                        .fetch_one(&mut *tx)
                        .await?;

                        // The hold was released before the success landed.
                        // Bail without committing: the payment stays pending
                        // and expires through the sweep, and the recorded
                        // notification is the trail for a manual refund.
                        if booking_status != BookingStatus::Confirmed {
                            return Err(anyhow!(
                                "booking {} already {} when success arrived",
                                payment.booking_id,
                                booking_status
                            ));
                        }
                    }

                    tracing::info!(
                        payment_id = %payment.id,
                        booking_id = %payment.booking_id,
                        "payment confirmed, booking finalized"
                    );
                } else if payment.status != PaymentStatus::Success {
                    // Forward-only: the payment already failed or expired.
                    tracing::warn!(
                        payment_id = %payment.id,
                        status = ?payment.status,
                        "ignoring late success notification for a settled payment"
                    );
                }
            }
            GatewayOutcome::Failed => {
                // Booking cancellation and inventory restoration are left to
                // the reconciliation sweep to keep the webhook path fast.
                sqlx::query(
                    "UPDATE payments SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
                )
                .bind(PaymentStatus::Failed)
                .bind(payment.id)
                .bind(PaymentStatus::Pending)
                .execute(&mut *tx)
                .await?;

                tracing::info!(payment_id = %payment.id, "payment marked failed");
            }
        }

        tx.commit().await?;

        Ok(())
    }

    /// Get the payment paired with a booking owned by the customer
    pub async fn get_payment_for_booking(
        &self,
        customer_id: &str,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, PaymentError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.* FROM payments p
            JOIN bookings b ON p.booking_id = b.id
            WHERE p.booking_id = $1 AND b.customer_id = $2
            "#,
        )
        .bind(booking_id)
        .bind(customer_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(payment)
    }

    async fn mark_notification(
        &self,
        note_id: i64,
        status: NotificationStatus,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payment_notifications
            SET processing_status = $1, error_message = $2, processed_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status)
        .bind(error_message)
        .bind(note_id)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }
}
