//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod intent_port;
mod tool_port;

#[cfg(test)]
pub use intent_port::MockIntentResolverPort;
pub use intent_port::{
    ConversationTurn, IntentRequest, IntentResolution, IntentResolverPort, Speaker,
    ToolInvocation,
};
#[cfg(test)]
pub use tool_port::MockToolExecutorPort;
pub use tool_port::ToolExecutorPort;
