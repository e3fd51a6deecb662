//! Inventory service layer - seat availability accounting
//!
//! All mutations of `remaining_quantity` in the system go through the two
//! operations here: an atomic conditional decrement at hold creation, and a
//! ledger-guarded increment at hold release. Both run on a caller-supplied
//! connection so they can participate in the caller's transaction.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::inventory::{
    InventoryError, ListAvailabilityQuery, SeatCategoryAvailability, INVENTORY_RESTORED_ACTION,
};

/// Inventory service for seat availability reads and accounting
pub struct InventoryService {
    db_pool: PgPool,
}

impl InventoryService {
    /// Create new inventory service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Get the availability row for one category/day pair
    pub async fn get_availability(
        &self,
        seat_category_id: i64,
        event_day_id: i64,
    ) -> Result<Option<SeatCategoryAvailability>, sqlx::Error> {
        sqlx::query_as::<_, SeatCategoryAvailability>(
            r#"
            SELECT * FROM seat_category_availability
            WHERE seat_category_id = $1 AND event_day_id = $2
            "#,
        )
        .bind(seat_category_id)
        .bind(event_day_id)
        .fetch_optional(&self.db_pool)
        .await
    }

    /// List availability rows with optional filtering
    pub async fn list_availability(
        &self,
        query: ListAvailabilityQuery,
    ) -> Result<Vec<SeatCategoryAvailability>, sqlx::Error> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
            "SELECT * FROM seat_category_availability WHERE is_enabled = TRUE",
        );

        if let Some(seat_category_id) = query.seat_category_id {
            query_builder.push(" AND seat_category_id = ");
            query_builder.push_bind(seat_category_id);
        }
        if let Some(event_day_id) = query.event_day_id {
            query_builder.push(" AND event_day_id = ");
            query_builder.push_bind(event_day_id);
        }

        query_builder.push(" ORDER BY event_day_id, seat_category_id");

        query_builder
            .build_query_as::<SeatCategoryAvailability>()
            .fetch_all(&self.db_pool)
            .await
    }

    /// Atomically claim `quantity` seats for a hold.
    ///
    /// The decrement and the availability check are a single conditional
    /// UPDATE, so two concurrent holds against the same row can never
    /// over-commit: the row lock serializes them and the `remaining_quantity
    /// >= quantity` predicate rejects the loser. A read-then-write pair here
    /// would be a correctness bug under concurrent load.
    pub async fn reserve(
        conn: &mut PgConnection,
        seat_category_id: i64,
        event_day_id: i64,
        quantity: i32,
    ) -> Result<(), InventoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE seat_category_availability
            SET remaining_quantity = remaining_quantity - $3, updated_at = NOW()
            WHERE seat_category_id = $1
              AND event_day_id = $2
              AND is_enabled
              AND remaining_quantity >= $3
            "#,
        )
        .bind(seat_category_id)
        .bind(event_day_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(());
        }

        // Zero rows affected: re-read to report which precondition failed.
        let row = sqlx::query_as::<_, (i32, bool)>(
            r#"
            SELECT remaining_quantity, is_enabled FROM seat_category_availability
            WHERE seat_category_id = $1 AND event_day_id = $2
            "#,
        )
        .bind(seat_category_id)
        .bind(event_day_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            None => Err(InventoryError::NotFound),
            Some((_, false)) => Err(InventoryError::Disabled),
            Some((remaining, true)) => Err(InventoryError::Insufficient { remaining }),
        }
    }

    /// Return `quantity` seats to the availability counter.
    async fn restore(
        conn: &mut PgConnection,
        seat_category_id: i64,
        event_day_id: i64,
        quantity: i32,
    ) -> Result<(), InventoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE seat_category_availability
            SET remaining_quantity = remaining_quantity + $3, updated_at = NOW()
            WHERE seat_category_id = $1 AND event_day_id = $2
            "#,
        )
        .bind(seat_category_id)
        .bind(event_day_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(InventoryError::NotFound);
        }

        Ok(())
    }

    /// Restore a booking's held quantity to inventory exactly once.
    ///
    /// The audit-ledger insert claims the restoration; if another pass (the
    /// 2-minute sweep, the hourly backup pass, or an explicit cancel) already
    /// claimed it, this is a no-op. Returns whether the restoration was
    /// applied by this call. Must run inside the caller's transaction so the
    /// ledger entry and the counter increment commit together.
    pub async fn restore_booking_once(
        conn: &mut PgConnection,
        booking_id: Uuid,
        seat_category_id: i64,
        event_day_id: i64,
        quantity: i32,
    ) -> Result<bool, InventoryError> {
        let claimed = sqlx::query(
            r#"
            INSERT INTO booking_audit_log (booking_id, action)
            VALUES ($1, $2)
            ON CONFLICT (booking_id, action) DO NOTHING
            "#,
        )
        .bind(booking_id)
        .bind(INVENTORY_RESTORED_ACTION)
        .execute(&mut *conn)
        .await?
        .rows_affected()
            == 1;

        if claimed {
            Self::restore(conn, seat_category_id, event_day_id, quantity).await?;
        }

        Ok(claimed)
    }
}
