//! Reconciliation sweep - eventual consistency for bookings, payments and inventory
//!
//! Each sweep runs four independent steps. Failures are logged and skipped
//! at the finest grain: one booking's failed transaction does not block the
//! rest of its step, and one step's failure does not block the remaining
//! steps; nothing here is fatal to the process. The
//! sweep only ever moves rows forward through their state machines, and all
//! inventory restoration goes through the ledger-guarded
//! `restore_booking_once`, so overlapping invocations (the 2-minute and
//! hourly schedules, or a concurrent explicit cancel) are safe.

use anyhow::Result;
use sqlx::PgPool;

use crate::booking::{Booking, BookingStatus};
use crate::inventory::{InventoryService, INVENTORY_RESTORED_ACTION};
use crate::payment::PaymentStatus;

/// Reconciliation service executing the periodic consistency sweep
pub struct ReconciliationService {
    db_pool: PgPool,
}

impl ReconciliationService {
    /// Create new reconciliation service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Run one full reconciliation pass. Idempotent: a second pass over the
    /// same state is a no-op.
    pub async fn run_sweep(&self) {
        match self.expire_stale_holds().await {
            Ok(n) if n > 0 => tracing::info!(count = n, "expired stale unpaid holds"),
            Ok(_) => {}
            Err(e) => tracing::error!("failed to expire stale holds: {:#}", e),
        }

        match self.cancel_failed_payment_bookings().await {
            Ok(n) if n > 0 => tracing::info!(count = n, "cancelled bookings behind failed payments"),
            Ok(_) => {}
            Err(e) => tracing::error!("failed to cancel failed-payment bookings: {:#}", e),
        }

        match self.expire_overdue_payments().await {
            Ok(n) if n > 0 => tracing::info!(count = n, "expired overdue pending payments"),
            Ok(_) => {}
            Err(e) => tracing::error!("failed to expire overdue payments: {:#}", e),
        }

        match self.restore_missed_releases().await {
            Ok(n) if n > 0 => tracing::warn!(count = n, "restored inventory missed by earlier transitions"),
            Ok(_) => {}
            Err(e) => tracing::error!("failed safety-net restoration: {:#}", e),
        }
    }

    /// Step 1: expire pending holds past their deadline that never got a
    /// payment row, restoring their quantity through the ledger.
    async fn expire_stale_holds(&self) -> Result<u64> {
        let stale = sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.* FROM bookings b
            WHERE b.status = $1
              AND b.expires_at <= NOW()
              AND NOT EXISTS (SELECT 1 FROM payments p WHERE p.booking_id = b.id)
            ORDER BY b.created_at
            "#,
        )
        .bind(BookingStatus::Pending)
        .fetch_all(&self.db_pool)
        .await?;

        // One failed booking must not block the rest of the batch; its
        // transaction rolls back and the next tick retries it.
        let mut expired = 0u64;
        for booking in stale {
            match self.expire_hold(&booking).await {
                Ok(true) => {
                    expired += 1;
                    tracing::info!(booking_id = %booking.id, "hold expired, inventory restored");
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(booking_id = %booking.id, "failed to expire hold: {:#}", e)
                }
            }
        }

        Ok(expired)
    }

    async fn expire_hold(&self, booking: &Booking) -> Result<bool> {
        let mut tx = self.db_pool.begin().await?;

        // Status guard: skip if a confirmation or cancel won the race.
        let transitioned = sqlx::query(
            "UPDATE bookings SET status = $1 WHERE id = $2 AND status = $3",
        )
        .bind(BookingStatus::Expired)
        .bind(booking.id)
        .bind(BookingStatus::Pending)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if transitioned == 1 {
            InventoryService::restore_booking_once(
                &mut tx,
                booking.id,
                booking.seat_category_id,
                booking.event_day_id,
                booking.quantity,
            )
            .await?;
        }

        tx.commit().await?;

        Ok(transitioned == 1)
    }

    /// Step 2: cancel bookings whose payment has failed, restoring their
    /// quantity through the ledger.
    async fn cancel_failed_payment_bookings(&self) -> Result<u64> {
        let behind_failed = sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.* FROM bookings b
            JOIN payments p ON p.booking_id = b.id
            WHERE p.status = $1 AND b.status NOT IN ($2, $3)
            "#,
        )
        .bind(PaymentStatus::Failed)
        .bind(BookingStatus::Cancelled)
        .bind(BookingStatus::Expired)
        .fetch_all(&self.db_pool)
        .await?;

        let mut cancelled = 0u64;
        for booking in behind_failed {
            match self.cancel_behind_failed_payment(&booking).await {
                Ok(true) => {
                    cancelled += 1;
                    tracing::info!(booking_id = %booking.id, "booking cancelled behind failed payment");
                }
                Ok(false) => {}
                Err(e) => tracing::error!(
                    booking_id = %booking.id,
                    "failed to cancel booking behind failed payment: {:#}", e
                ),
            }
        }

        Ok(cancelled)
    }

    async fn cancel_behind_failed_payment(&self, booking: &Booking) -> Result<bool> {
        let mut tx = self.db_pool.begin().await?;

        let transitioned = sqlx::query(
            "UPDATE bookings SET status = $1 WHERE id = $2 AND status NOT IN ($1, $3)",
        )
        .bind(BookingStatus::Cancelled)
        .bind(booking.id)
        .bind(BookingStatus::Expired)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if transitioned == 1 {
            InventoryService::restore_booking_once(
                &mut tx,
                booking.id,
                booking.seat_category_id,
                booking.event_day_id,
                booking.quantity,
            )
            .await?;
        }

        tx.commit().await?;

        Ok(transitioned == 1)
    }

    /// Step 3: fail pending payments past their deadline. This feeds step 2
    /// on the next tick; decoupling the two keeps a single pass from having
    /// to reason about payment and booking transitions for the same row.
    async fn expire_overdue_payments(&self) -> Result<u64> {
        let failed = sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, updated_at = NOW()
            WHERE status = $2 AND expires_at <= NOW()
            "#,
        )
        .bind(PaymentStatus::Failed)
        .bind(PaymentStatus::Pending)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(failed)
    }

    /// Step 4: safety net. Any terminal booking whose transition happened
    /// without the accompanying inventory fix (admin action, crash between
    /// transition and restoration) gets its quantity restored exactly once.
    async fn restore_missed_releases(&self) -> Result<u64> {
        let unrestored = sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.* FROM bookings b
            WHERE b.status IN ($1, $2)
              AND NOT EXISTS (
                  SELECT 1 FROM booking_audit_log l
                  WHERE l.booking_id = b.id AND l.action = $3
              )
            "#,
        )
        .bind(BookingStatus::Expired)
        .bind(BookingStatus::Cancelled)
        .bind(INVENTORY_RESTORED_ACTION)
        .fetch_all(&self.db_pool)
        .await?;

        let mut restored = 0u64;
        for booking in unrestored {
            match self.restore_release(&booking).await {
                Ok(true) => {
                    restored += 1;
                    tracing::warn!(
                        booking_id = %booking.id,
                        status = %booking.status,
                        "safety net restored inventory for terminal booking"
                    );
                }
                Ok(false) => {}
                Err(e) => tracing::error!(
                    booking_id = %booking.id,
                    "failed to restore inventory for terminal booking: {:#}", e
                ),
            }
        }

        Ok(restored)
    }

    async fn restore_release(&self, booking: &Booking) -> Result<bool> {
        let mut tx = self.db_pool.begin().await?;

        let applied = InventoryService::restore_booking_once(
            &mut tx,
            booking.id,
            booking.seat_category_id,
            booking.event_day_id,
            booking.quantity,
        )
        .await?;

        tx.commit().await?;

        Ok(applied)
    }
}
