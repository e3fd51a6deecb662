//! Booking server library
//!
//! This library exports the core modules for the festival seat booking
//! backend: cart staging, the reservation engine, payment confirmation, and
//! the reconciliation scheduler that keeps the three consistent.

pub mod auth;
pub mod booking;
pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod inventory;
pub mod models;
pub mod payment;
pub mod reconciliation;
pub mod routes;
pub mod state;
