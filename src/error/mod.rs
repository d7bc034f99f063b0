//! Error handling
//!
//! Defines the client error type and its mapping to caller status codes.

pub mod handlers;
pub mod types;

pub use handlers::{log_failure, status_code};
pub use types::*;
