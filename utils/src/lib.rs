//! Shared utilities for the token splitter.

pub mod display;
pub mod logging;

pub use display::{abbreviate_address, pluralize};
pub use logging::{init_logging, LogFormat};
