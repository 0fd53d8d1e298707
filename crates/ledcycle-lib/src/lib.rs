//! ledcycle — cycle a tri-color LED with one push button, stop with another.
//!
//! Both buttons are sampled by periodic timers multiplexed on a single
//! blocking wait; everything runs on one thread except the termination
//! request, which may arrive from a signal.

pub mod app;
pub mod config;
pub mod debounce;
pub mod error;
pub mod gpio;
pub mod led;
pub mod mux;
pub mod scheduler;
pub mod shutdown;

pub use error::LedCycleError;
