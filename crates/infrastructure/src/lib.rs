//! Infrastructure layer - Configuration, logging and adapters
//!
//! Implements the ports defined in the application layer and wires the
//! voice stack together for hosts and the CLI.

pub mod adapters;
pub mod bootstrap;
pub mod config;
pub mod telemetry;

pub use adapters::{CannedIntentAdapter, ScriptedToolAdapter};
pub use bootstrap::SimulatedVoiceStack;
pub use config::{AppConfig, AppConfigError};
pub use telemetry::{TelemetryConfig, TelemetryError, init_logging};
