//! Shared types and models for the rice leaf disease diagnostics service
//!
//! This crate holds the pure, I/O-free parts of the system so the backend
//! and the browser client (via WASM) compute the same adjusted predictions.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
