//! Tool port - Interface for executing resolver-requested tools

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;
use crate::ports::ToolInvocation;

/// Port for executing tools (take photo, toggle effects, ...)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Run a tool, returning text to speak if the tool produced any
    async fn execute(&self, invocation: ToolInvocation) -> Result<Option<String>, ApplicationError>;
}
