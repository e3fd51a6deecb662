//! Reservation engine - converts cart selections into time-bounded holds
//!
//! The batch operation is all-or-nothing: every selection's availability
//! check, hold insert and cart deletion run in one transaction, so partial
//! application is never observable and a failed selection rolls back the
//! whole batch.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::booking::{
    Booking, BookingError, BookingStatus, BookingWithDetails, ListBookingsQuery,
    HOLD_DURATION_MINUTES,
};
use crate::cart::CartItem;
use crate::inventory::InventoryService;
use crate::payment::PaymentStatus;

/// Booking service for the reservation lifecycle
pub struct BookingService {
    db_pool: PgPool,
}

impl BookingService {
    /// Create new booking service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Convert the customer's staged cart entries into pending holds.
    ///
    /// Per selection, in order: the availability row must exist and be
    /// enabled, the staging entry must be unexpired, and the atomic
    /// conditional decrement must find enough remaining seats. Selections
    /// are processed in the order submitted; the first batch to pass the
    /// check under its own transaction wins.
    pub async fn create_bookings(
        &self,
        customer_id: &str,
        cart_item_ids: &[Uuid],
    ) -> Result<Vec<BookingWithDetails>, BookingError> {
        let mut tx = self.db_pool.begin().await?;
        let now = Utc::now();
        let expires_at = now + Duration::minutes(HOLD_DURATION_MINUTES);

        let mut booking_ids = Vec::with_capacity(cart_item_ids.len());

        for item_id in cart_item_ids {
            let item = sqlx::query_as::<_, CartItem>(
                "SELECT * FROM cart_items WHERE id = $1 AND customer_id = $2",
            )
            .bind(item_id)
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(BookingError::CartItemNotFound)?;

            let enabled = sqlx::query_as::<_, (bool,)>(
                r#"
                SELECT is_enabled FROM seat_category_availability
                WHERE seat_category_id = $1 AND event_day_id = $2
                "#,
            )
            .bind(item.seat_category_id)
            .bind(item.event_day_id)
            .fetch_optional(&mut *tx)
            .await?;

            if !matches!(enabled, Some((true,))) {
                return Err(BookingError::CategoryUnavailable);
            }

            if item.expires_at <= now {
                return Err(BookingError::StaleCartItem);
            }

            InventoryService::reserve(
                &mut tx,
                item.seat_category_id,
                item.event_day_id,
                item.quantity,
            )
            .await?;

            let booking_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO bookings (
                    id, customer_id, seat_category_id, event_day_id,
                    quantity, total_price, status, created_at, expires_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(booking_id)
            .bind(customer_id)
            .bind(item.seat_category_id)
            .bind(item.event_day_id)
            .bind(item.quantity)
            .bind(item.price_per_seat * item.quantity as i64)
            .bind(BookingStatus::Pending)
            .bind(now)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM cart_items WHERE id = $1")
                .bind(item_id)
                .execute(&mut *tx)
                .await?;

            booking_ids.push(booking_id);
        }

        let created = sqlx::query_as::<_, BookingWithDetails>(
            r#"
            SELECT
                b.*,
                s.name AS shop_name,
                c.name AS category_name,
                d.event_date
            FROM bookings b
            JOIN seat_categories c ON b.seat_category_id = c.id
            JOIN shops s ON c.shop_id = s.id
            JOIN event_days d ON b.event_day_id = d.id
            WHERE b.id = ANY($1)
            ORDER BY b.created_at
            "#,
        )
        .bind(&booking_ids)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            customer_id = %customer_id,
            count = created.len(),
            "created pending bookings"
        );

        Ok(created)
    }

    /// Get a single booking owned by the customer, with display data
    pub async fn get_booking(
        &self,
        customer_id: &str,
        booking_id: Uuid,
    ) -> Result<Option<BookingWithDetails>, BookingError> {
        let booking = sqlx::query_as::<_, BookingWithDetails>(
            r#"
            SELECT
                b.*,
                s.name AS shop_name,
                c.name AS category_name,
                d.event_date
            FROM bookings b
            JOIN seat_categories c ON b.seat_category_id = c.id
            JOIN shops s ON c.shop_id = s.id
            JOIN event_days d ON b.event_day_id = d.id
            WHERE b.id = $1 AND b.customer_id = $2
            "#,
        )
        .bind(booking_id)
        .bind(customer_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(booking)
    }

    /// List the customer's bookings with filtering and pagination
    pub async fn list_bookings(
        &self,
        customer_id: &str,
        query: ListBookingsQuery,
    ) -> Result<Vec<Booking>, BookingError> {
        // Offset arithmetic in i64: caller-supplied page numbers must not
        // overflow the i32 multiply.
        let page = i64::from(query.page.unwrap_or(1).max(1));
        let limit = i64::from(query.limit.unwrap_or(20).clamp(1, 100));
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM bookings WHERE customer_id = ");
        query_builder.push_bind(customer_id);

        if let Some(status) = query.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let bookings = query_builder
            .build_query_as::<Booking>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(bookings)
    }

    /// Explicit customer cancel of a pending hold.
    ///
    /// Only a pending booking with no successful payment can be cancelled.
    /// The held quantity is returned through the restoration ledger, so a
    /// later reconciliation pass over the same booking is a no-op.
    pub async fn cancel_booking(
        &self,
        customer_id: &str,
        booking_id: Uuid,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.db_pool.begin().await?;

        // Lock the payment row before the booking row, the same order the
        // webhook confirmation path acquires them. A cancel racing an
        // in-flight confirmation blocks here and then observes the committed
        // payment status instead of a stale snapshot.
        let payment_status = sqlx::query_as::<_, (PaymentStatus,)>(
            "SELECT status FROM payments WHERE booking_id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE id = $1 AND customer_id = $2 FOR UPDATE",
        )
        .bind(booking_id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BookingError::NotFound)?;

        if booking.status != BookingStatus::Pending {
            return Err(BookingError::NotCancellable(booking.status));
        }

        if matches!(payment_status, Some((PaymentStatus::Success,))) {
            return Err(BookingError::NotCancellable(BookingStatus::Confirmed));
        }

        let cancelled = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = $1
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(BookingStatus::Cancelled)
        .bind(booking_id)
        .bind(BookingStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        InventoryService::restore_booking_once(
            &mut tx,
            booking.id,
            booking.seat_category_id,
            booking.event_day_id,
            booking.quantity,
        )
        .await
        .map_err(BookingError::from)?;

        tx.commit().await?;

        tracing::info!(booking_id = %booking_id, "booking cancelled by customer");

        Ok(cancelled)
    }
}
