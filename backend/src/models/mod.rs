//! Model re-exports from the shared crate

pub use shared::models::*;
