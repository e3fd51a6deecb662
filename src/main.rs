//! Booking server binary
//!
//! Wires configuration, the database pool, the domain services, the
//! reconciliation scheduler and the HTTP router, then serves until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use utsav_booking_server::auth::FirebaseAuth;
use utsav_booking_server::booking::BookingService;
use utsav_booking_server::cart::CartService;
use utsav_booking_server::config::Config;
use utsav_booking_server::inventory::InventoryService;
use utsav_booking_server::payment::PaymentService;
use utsav_booking_server::reconciliation::{start_scheduler, ReconciliationService};
use utsav_booking_server::state::AppState;
use utsav_booking_server::{db, routes};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "starting booking server");

    // Initialize database connection pool and schema
    let db_pool = match db::create_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&db_pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    // Initialize domain services
    let inventory_service = Arc::new(InventoryService::new(db_pool.clone()));
    let cart_service = Arc::new(CartService::new(db_pool.clone()));
    let booking_service = Arc::new(BookingService::new(db_pool.clone()));
    let payment_service = Arc::new(PaymentService::new(
        db_pool.clone(),
        config.gateway_webhook_secret.clone(),
    ));
    let reconciliation_service = Arc::new(ReconciliationService::new(db_pool.clone()));
    let firebase_auth = Arc::new(FirebaseAuth::new(config.firebase_project_id.clone()));

    // Start the reconciliation schedules (2-minute primary + hourly backup).
    // The handle must stay alive for the lifetime of the process.
    let _scheduler = match start_scheduler(reconciliation_service).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start reconciliation scheduler: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(
        booking_service,
        cart_service,
        payment_service,
        inventory_service,
        firebase_auth,
        db_pool,
    );

    // Create the app router
    let app = Router::new()
        .route("/health", axum::routing::get(utsav_booking_server::handlers::health_check))
        .merge(routes::availability_routes())
        .merge(routes::cart_routes())
        .merge(routes::booking_routes())
        .merge(routes::payment_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(configure_cors(&config.cors_allowed_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Serve with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

fn configure_cors(allowed_origins: &Option<String>) -> CorsLayer {
    let Some(origins_str) = allowed_origins.as_deref().filter(|s| !s.is_empty()) else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
