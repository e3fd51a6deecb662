//! Route definitions for the booking API

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

// Availability routes
pub fn availability_routes() -> Router<AppState> {
    Router::new().route("/api/availability", get(list_availability))
}

// Cart routes
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", post(add_cart_item))
        .route("/api/cart", get(list_cart_items))
        .route("/api/cart/:id", delete(remove_cart_item))
}

// Booking routes
pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_bookings))
        .route("/api/bookings", get(list_bookings))
        .route("/api/bookings/:id", get(get_booking))
        .route("/api/bookings/:id/cancel", post(cancel_booking))
}

// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings/:id/checkout", post(initiate_checkout))
        .route("/api/bookings/:id/payment", get(get_payment))
        .route("/api/payments/webhook", post(payment_webhook))
}
