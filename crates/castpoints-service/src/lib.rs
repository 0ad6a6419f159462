//! Castpoints HTTP API Service.
//!
//! This crate provides the HTTP API for the castpoints ledger, including:
//!
//! - New-user account bootstrap with the one-time bonus
//! - Points balance and transaction history
//! - Daily sign-in rewards
//! - Podcast-generation usage gating and completion debits
//!
//! # Authentication
//!
//! The service supports three authentication methods:
//!
//! 1. **OAuth JWT tokens** - For end-user requests (web front end / BFF)
//! 2. **Service API keys** - For the generation service's callbacks
//! 3. **Admin API keys** - For manual point adjustments

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::JwksCache;
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
