//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod print;
pub mod telemetry;
