//! API handlers
//!
//! Thin HTTP layer over the domain services. All business decisions live in
//! the service layer; handlers only extract, validate and shape JSON.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedCustomer;
use crate::booking::{Booking, BookingWithDetails, CreateBookingsRequest, ListBookingsQuery};
use crate::cart::{AddCartItemRequest, CartItem};
use crate::error::{ApiError, ApiResult};
use crate::inventory::{ListAvailabilityQuery, SeatCategoryAvailability};
use crate::models::ApiResponse;
use crate::payment::{GatewayNotification, NotificationOutcome, Payment};
use crate::state::AppState;

// ===== Health =====

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    crate::db::check_health(&state.db_pool)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    Ok(Json(json!({ "status": "ok" })))
}

// ===== Availability =====

/// List remaining seat availability, optionally filtered by category or day
pub async fn list_availability(
    State(state): State<AppState>,
    Query(query): Query<ListAvailabilityQuery>,
) -> ApiResult<Json<ApiResponse<Vec<SeatCategoryAvailability>>>> {
    let rows = state.inventory_service.list_availability(query).await?;
    Ok(Json(ApiResponse::success(rows)))
}

// ===== Cart =====

pub async fn add_cart_item(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Json(request): Json<AddCartItemRequest>,
) -> ApiResult<Json<ApiResponse<CartItem>>> {
    request.validate()?;
    let item = state.cart_service.add_item(&customer_id, request).await?;
    Ok(Json(ApiResponse::success(item)))
}

pub async fn list_cart_items(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
) -> ApiResult<Json<ApiResponse<Vec<CartItem>>>> {
    let items = state.cart_service.list_items(&customer_id).await?;
    Ok(Json(ApiResponse::success(items)))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.cart_service.remove_item(&customer_id, item_id).await?;
    Ok(Json(ApiResponse::success(())))
}

// ===== Bookings =====

/// Convert staged cart entries into pending holds (all-or-nothing)
pub async fn create_bookings(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Json(request): Json<CreateBookingsRequest>,
) -> ApiResult<Json<ApiResponse<Vec<BookingWithDetails>>>> {
    request.validate()?;
    let bookings = state
        .booking_service
        .create_bookings(&customer_id, &request.cart_item_ids)
        .await?;
    Ok(Json(ApiResponse::success(bookings)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<BookingWithDetails>>> {
    let booking = state
        .booking_service
        .get_booking(&customer_id, booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("booking not found".to_string()))?;
    Ok(Json(ApiResponse::success(booking)))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Query(query): Query<ListBookingsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Booking>>>> {
    let bookings = state
        .booking_service
        .list_bookings(&customer_id, query)
        .await?;
    Ok(Json(ApiResponse::success(bookings)))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state
        .booking_service
        .cancel_booking(&customer_id, booking_id)
        .await?;
    Ok(Json(ApiResponse::success(booking)))
}

// ===== Payments =====

/// Create the pending payment row paired with a booking hold
pub async fn initiate_checkout(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Payment>>> {
    let payment = state
        .payment_service
        .initiate_checkout(&customer_id, booking_id)
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Payment>>> {
    let payment = state
        .payment_service
        .get_payment_for_booking(&customer_id, booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("payment not found".to_string()))?;
    Ok(Json(ApiResponse::success(payment)))
}

/// Inbound gateway webhook.
///
/// Always acks 2xx once the notification is durably recorded, whatever the
/// processing outcome: the gateway retries on non-2xx and the reconciliation
/// sweep is the backstop for anything that slips through.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(notification): Json<GatewayNotification>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let outcome = state
        .payment_service
        .handle_notification(notification)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if let NotificationOutcome::Rejected(reason) = &outcome {
        tracing::warn!(reason = %reason, "gateway notification absorbed without state change");
    }

    Ok(Json(ApiResponse::success(())))
}
