//! Sales Order API Library
//!
//! HTTP service over a sales-history store: product catalog, recent sales
//! feed and transactional order placement.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod telemetry;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::{config::AppConfig, db::DbPool, services::OrderService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, cfg: &AppConfig) -> Self {
        let orders = Arc::new(OrderService::new(db.clone(), cfg.orders.clone()));
        Self { db, orders }
    }
}

/// All public routes, without middleware
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::health::ping))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/products", get(handlers::orders::list_products))
        .route("/sales", get(handlers::orders::list_sales))
        .route("/add-order", post(handlers::orders::add_order))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
}

/// Builds the CORS policy from config.
///
/// An explicit origin list wins; otherwise any origin is allowed when enabled.
pub fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.cors_allow_any_origin {
        info!("Using permissive CORS");
        CorsLayer::permissive()
    } else {
        warn!("No usable CORS origins configured; cross-origin requests will be rejected");
        CorsLayer::new()
    }
}

/// Full application router with tracing, CORS and request ids applied
pub fn build_router(state: AppState, cfg: &AppConfig) -> Router {
    api_routes()
        .layer(telemetry::configure_http_tracing())
        .layer(cors_layer(cfg))
        // Outermost so every span and error body sees the request id
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
