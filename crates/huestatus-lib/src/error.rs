//! Unified error type for the huestatus-lib crate.
//!
//! [`HueStatusError`] wraps module-specific errors (`BridgeError`,
//! `ValidationError`) and the not-found and persistence failures raised by
//! commands. `From` impls allow `?` to propagate across module boundaries.

use std::fmt;

use crate::client::BridgeError;
use crate::config::ValidationError;

/// Unified error type for huestatus-lib operations.
#[derive(Debug)]
pub enum HueStatusError {
    /// Configuration document rejected.
    Validation(ValidationError),
    /// Bridge communication or device-reported error.
    Bridge(BridgeError),
    /// A command named a bridge or group that does not exist.
    NotFound(String),
    /// Standard I/O error (store file read/write).
    Io(std::io::Error),
    /// Persisted data could not be decoded.
    Store(String),
}

impl fmt::Display for HueStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HueStatusError::Validation(e) => write!(f, "Config error: {e}"),
            HueStatusError::Bridge(e) => write!(f, "{e}"),
            HueStatusError::NotFound(what) => write!(f, "Not found: {what}"),
            HueStatusError::Io(e) => write!(f, "I/O error: {e}"),
            HueStatusError::Store(e) => write!(f, "Store error: {e}"),
        }
    }
}

impl std::error::Error for HueStatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HueStatusError::Validation(e) => Some(e),
            HueStatusError::Bridge(e) => Some(e),
            HueStatusError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for HueStatusError {
    fn from(e: ValidationError) -> Self {
        HueStatusError::Validation(e)
    }
}

impl From<BridgeError> for HueStatusError {
    fn from(e: BridgeError) -> Self {
        HueStatusError::Bridge(e)
    }
}

impl From<std::io::Error> for HueStatusError {
    fn from(e: std::io::Error) -> Self {
        HueStatusError::Io(e)
    }
}

/// Crate-level Result alias using [`HueStatusError`].
pub type Result<T> = std::result::Result<T, HueStatusError>;
