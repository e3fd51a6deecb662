//! Shared fixtures for database-backed tests
#![allow(dead_code)]

use sqlx::PgPool;
use uuid::Uuid;

use utsav_booking_server::booking::BookingStatus;
use utsav_booking_server::cart::{AddCartItemRequest, CartService};
use utsav_booking_server::payment::PaymentStatus;

/// Shared secret used by webhook tests
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Connect to the test database and apply migrations
pub async fn setup_test_db() -> PgPool {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost/utsav_booking_test".to_string());

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// One seeded (seat category, event day) pair with a fresh availability row
pub struct Fixture {
    pub seat_category_id: i64,
    pub event_day_id: i64,
}

/// Seed a shop, event day, category and availability row with the given capacity
pub async fn seed_category(pool: &PgPool, capacity: i32, unit_price: i64) -> Fixture {
    let (shop_id,): (i64,) = sqlx::query_as("INSERT INTO shops (name) VALUES ($1) RETURNING id")
        .bind(format!("shop-{}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap();

    let (event_day_id,): (i64,) = sqlx::query_as(
        "INSERT INTO event_days (event_date) VALUES (CURRENT_DATE + 30) RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let (seat_category_id,): (i64,) = sqlx::query_as(
        "INSERT INTO seat_categories (shop_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(shop_id)
    .bind("gallery")
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO seat_category_availability
            (seat_category_id, event_day_id, unit_price, remaining_quantity)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(seat_category_id)
    .bind(event_day_id)
    .bind(unit_price)
    .bind(capacity)
    .execute(pool)
    .await
    .unwrap();

    Fixture {
        seat_category_id,
        event_day_id,
    }
}

/// Stage a cart entry for the fixture and return its id
pub async fn stage_cart_item(
    pool: &PgPool,
    customer_id: &str,
    fixture: &Fixture,
    quantity: i32,
) -> Uuid {
    let cart_service = CartService::new(pool.clone());
    let item = cart_service
        .add_item(
            customer_id,
            AddCartItemRequest {
                seat_category_id: fixture.seat_category_id,
                event_day_id: fixture.event_day_id,
                quantity,
            },
        )
        .await
        .unwrap();
    item.id
}

/// Read the current remaining quantity for the fixture
pub async fn remaining_quantity(pool: &PgPool, fixture: &Fixture) -> i32 {
    let (remaining,): (i32,) = sqlx::query_as(
        r#"
        SELECT remaining_quantity FROM seat_category_availability
        WHERE seat_category_id = $1 AND event_day_id = $2
        "#,
    )
    .bind(fixture.seat_category_id)
    .bind(fixture.event_day_id)
    .fetch_one(pool)
    .await
    .unwrap();
    remaining
}

/// Read a booking's current status
pub async fn booking_status(pool: &PgPool, booking_id: Uuid) -> BookingStatus {
    let (status,): (BookingStatus,) =
        sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(pool)
            .await
            .unwrap();
    status
}

/// Read a payment's current status
pub async fn payment_status(pool: &PgPool, payment_id: Uuid) -> PaymentStatus {
    let (status,): (PaymentStatus,) =
        sqlx::query_as("SELECT status FROM payments WHERE id = $1")
            .bind(payment_id)
            .fetch_one(pool)
            .await
            .unwrap();
    status
}

/// Force a booking's hold deadline into the past
pub async fn force_booking_expiry(pool: &PgPool, booking_id: Uuid) {
    sqlx::query("UPDATE bookings SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(booking_id)
        .execute(pool)
        .await
        .unwrap();
}

/// Force a payment's deadline into the past
pub async fn force_payment_expiry(pool: &PgPool, payment_id: Uuid) {
    sqlx::query("UPDATE payments SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(payment_id)
        .execute(pool)
        .await
        .unwrap();
}
