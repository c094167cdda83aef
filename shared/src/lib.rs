//! Shared types and models for the Inventory Management Platform
//!
//! This crate contains types shared between the backend services, the API
//! surface, and the test suites.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
