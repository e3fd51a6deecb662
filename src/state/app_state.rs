//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::FirebaseAuth;
use crate::booking::BookingService;
use crate::cart::CartService;
use crate::inventory::InventoryService;
use crate::payment::PaymentService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub booking_service: Arc<BookingService>,
    pub cart_service: Arc<CartService>,
    pub payment_service: Arc<PaymentService>,
    pub inventory_service: Arc<InventoryService>,
    pub firebase_auth: Arc<FirebaseAuth>,
    pub db_pool: PgPool,
}

impl AppState {
    pub fn new(
        booking_service: Arc<BookingService>,
        cart_service: Arc<CartService>,
        payment_service: Arc<PaymentService>,
        inventory_service: Arc<InventoryService>,
        firebase_auth: Arc<FirebaseAuth>,
        db_pool: PgPool,
    ) -> Self {
        Self {
            booking_service,
            cart_service,
            payment_service,
            inventory_service,
            firebase_auth,
            db_pool,
        }
    }
}

impl FromRef<AppState> for Arc<BookingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.booking_service.clone()
    }
}

impl FromRef<AppState> for Arc<CartService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.cart_service.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}

impl FromRef<AppState> for Arc<InventoryService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.inventory_service.clone()
    }
}

impl FromRef<AppState> for Arc<FirebaseAuth> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.firebase_auth.clone()
    }
}
