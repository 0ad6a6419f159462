//! API handlers.

pub mod accounts;
pub mod generation;
pub mod health;
pub mod points;
