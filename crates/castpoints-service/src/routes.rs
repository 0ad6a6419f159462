//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, generation, health, points};
use crate::state::AppState;

/// Maximum concurrent requests for generation endpoints.
/// These take callback traffic from the generation pipeline, which can burst.
const GENERATION_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (user JWT auth)
/// - `POST /v1/accounts` - Bootstrap account (new-user bonus)
/// - `GET /v1/accounts/me` - Get current user's account
///
/// ## Points (user JWT auth)
/// - `GET /v1/points/balance` - Get current balance
/// - `GET /v1/points/transactions` - List transaction history
/// - `POST /v1/points/daily-signin` - Claim the daily sign-in reward
///
/// ## Admin (admin key auth)
/// - `POST /v1/points/grant` - Grant points manually
///
/// ## Generation (service API key auth, concurrency-limited)
/// - `POST /v1/generation/check` - Usage gate pre-check
/// - `POST /v1/generation/complete` - Completion callback (debit)
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Generation callbacks get their own, higher concurrency limit: the
    // pipeline fans out completion callbacks in bursts.
    let generation_routes = Router::new()
        .route("/check", post(generation::check_generation))
        .route("/complete", post(generation::complete_generation))
        .layer(ConcurrencyLimitLayer::new(
            GENERATION_MAX_CONCURRENT_REQUESTS,
        ));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::bootstrap_account))
        .route("/accounts/me", get(accounts::get_account))
        // Points
        .route("/points/balance", get(points::get_balance))
        .route("/points/transactions", get(points::list_transactions))
        .route("/points/daily-signin", post(points::daily_sign_in))
        .route("/points/grant", post(points::grant_points))
        // Generation routes (with their own concurrency limit)
        .nest("/generation", generation_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
