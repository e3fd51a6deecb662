//! Cart service layer - staging selections ahead of reservation

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cart::{AddCartItemRequest, CartError, CartItem, CART_TTL_MINUTES};

/// Cart service for managing staged selections
pub struct CartService {
    db_pool: PgPool,
}

impl CartService {
    /// Create new cart service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Stage a selection in the customer's cart.
    ///
    /// The staged price is snapshotted from the availability row; staging
    /// does not commit any inventory.
    pub async fn add_item(
        &self,
        customer_id: &str,
        request: AddCartItemRequest,
    ) -> Result<CartItem, CartError> {
        let availability = sqlx::query_as::<_, (i64, bool)>(
            r#"
            SELECT unit_price, is_enabled FROM seat_category_availability
            WHERE seat_category_id = $1 AND event_day_id = $2
            "#,
        )
        .bind(request.seat_category_id)
        .bind(request.event_day_id)
        .fetch_optional(&self.db_pool)
        .await?;

        let unit_price = match availability {
            Some((price, true)) => price,
            _ => return Err(CartError::CategoryUnavailable),
        };

        let now = Utc::now();
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (
                id, customer_id, seat_category_id, event_day_id,
                quantity, price_per_seat, expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(request.seat_category_id)
        .bind(request.event_day_id)
        .bind(request.quantity)
        .bind(unit_price)
        .bind(now + Duration::minutes(CART_TTL_MINUTES))
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(item)
    }

    /// List the customer's unexpired cart entries
    pub async fn list_items(&self, customer_id: &str) -> Result<Vec<CartItem>, CartError> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT * FROM cart_items
            WHERE customer_id = $1 AND expires_at > NOW()
            ORDER BY created_at
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(items)
    }

    /// Remove a cart entry owned by the customer
    pub async fn remove_item(&self, customer_id: &str, item_id: Uuid) -> Result<(), CartError> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND customer_id = $2")
            .bind(item_id)
            .bind(customer_id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(CartError::NotFound);
        }

        Ok(())
    }
}
