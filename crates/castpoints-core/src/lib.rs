//! Core types for the castpoints ledger.
//!
//! This crate provides the foundational types used throughout the castpoints
//! platform:
//!
//! - **Identifiers**: `UserId`, `TransactionId`
//! - **Accounts**: `Account`
//! - **Ledger**: `PointTransaction`, `ReasonCode`
//! - **Policy**: `PolicyConfig`
//!
//! # Points
//!
//! Points are whole units stored as `i64`. The account row holds the current
//! balance; every balance change also appends a `PointTransaction` with a
//! signed delta, and the two are written in one atomic unit so that
//! `total_points == sum(points_change)` holds for every user at all times.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod ids;
pub mod ledger;
pub mod policy;

pub use account::Account;
pub use ids::{IdError, TransactionId, UserId};
pub use ledger::{PointTransaction, ReasonCode};
pub use policy::PolicyConfig;
