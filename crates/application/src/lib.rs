//! Application layer - Use cases and orchestration
//!
//! Contains the speech orchestrator, the voice command router and the port
//! definitions for intent resolution and tool execution. Coordinates the
//! speech wrappers from `ai_speech` without knowing which platform engines
//! sit behind them.

pub mod command_router;
pub mod error;
pub mod ports;
pub mod services;

pub use command_router::{CommandId, CommandInvocation, CommandPattern, CommandRouter};
pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
