//! Error handlers
//!
//! Integer status mapping for callers that speak the classic
//! "0 / reply code / negative" contract, and class-aware logging.

use log::{error, warn};

use crate::error::types::{FailureClass, FtpClientError, FtpResult};

/// Status returned for a successful operation.
pub const SUCCESS: i32 = 0;

/// Status returned for every failure that carries no reply code.
pub const INCORRECT: i32 = -1;

/// Convert an error to the caller-facing status: the reply code for protocol
/// failures, `INCORRECT` otherwise.
pub fn error_to_status(err: &FtpClientError) -> i32 {
    match err.reply() {
        Some(reply) => i32::from(reply.code()),
        None => INCORRECT,
    }
}

/// Status of a whole operation result.
pub fn status_code<T>(result: &FtpResult<T>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(e) => error_to_status(e),
    }
}

/// Log an error at a level matching its class.
pub fn log_failure(context: &str, err: &FtpClientError) {
    match err.class() {
        FailureClass::Protocol | FailureClass::Transient => warn!("{context}: {err}"),
        FailureClass::Malformed | FailureClass::Local => error!("{context}: {err}"),
    }
}
