//! Unified error type for the ledcycle-lib crate.
//!
//! [`LedCycleError`] wraps peripheral errors ([`GpioError`]) and the
//! multiplexer/setup error kinds. `From` impls let `?` cross module
//! boundaries without ceremony.

use std::fmt;

use crate::config::ValidationError;
use crate::gpio::GpioError;

/// Unified error type for ledcycle-lib operations.
///
/// String payloads follow the convention **"context: details"**, where the
/// context names the failing call (e.g. `"epoll_wait"`, `"timerfd read"`).
#[derive(Debug)]
pub enum LedCycleError {
    /// Peripheral open, read, write or close failure.
    Gpio(GpioError),
    /// Readiness multiplexer failure while waiting or consuming a timer event.
    Io(String),
    /// Registration or allocation failure during setup.
    Resource(String),
    /// Invalid settings.
    Config(String),
}

impl fmt::Display for LedCycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedCycleError::Gpio(e) => write!(f, "{e}"),
            LedCycleError::Io(e) => write!(f, "I/O error: {e}"),
            LedCycleError::Resource(e) => write!(f, "Resource error: {e}"),
            LedCycleError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for LedCycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedCycleError::Gpio(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpioError> for LedCycleError {
    fn from(e: GpioError) -> Self {
        LedCycleError::Gpio(e)
    }
}

impl From<ValidationError> for LedCycleError {
    fn from(e: ValidationError) -> Self {
        LedCycleError::Config(e.to_string())
    }
}

/// Crate-level Result alias using [`LedCycleError`].
pub type Result<T> = std::result::Result<T, LedCycleError>;
