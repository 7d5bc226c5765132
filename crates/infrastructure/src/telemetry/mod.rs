//! Logging infrastructure

mod logging;

pub use logging::{TelemetryConfig, TelemetryError, init_logging};
