//! Castpoints Client SDK.
//!
//! This crate provides a client library for services to interact with the
//! castpoints API. The main consumer is the podcast-generation pipeline,
//! which pre-checks balances before starting a job and reports completions
//! so the cost is debited.
//!
//! # Example
//!
//! ```no_run
//! use castpoints_client::{CastpointsClient, GenerationCompletion};
//! use chrono::Utc;
//!
//! # async fn example() -> Result<(), castpoints_client::ClientError> {
//! let client = CastpointsClient::new(
//!     "http://castpoints.podcast-system.svc:8080",
//!     "your-service-api-key",
//! );
//!
//! // Gate check before starting a generation
//! let check = client.check_generation("user-uuid", 300).await?;
//! if !check.allowed {
//!     println!("User cannot afford this generation");
//! }
//!
//! // Report the completed generation (debits the user)
//! let charge = client.complete_generation(GenerationCompletion {
//!     task_id: "task_123".to_string(),
//!     user_id: "user-uuid".to_string(),
//!     duration_seconds: 287,
//!     completed_at: Utc::now(),
//! }).await?;
//!
//! println!("Charged {} points, balance now {}", charge.cost, charge.total_points);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{CastpointsClient, ClientOptions};
pub use error::ClientError;
pub use types::*;
