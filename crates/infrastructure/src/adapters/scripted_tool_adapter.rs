//! Scripted tool adapter - Fixed spoken output per tool name

use std::collections::HashMap;

use application::error::ApplicationError;
use application::ports::{ToolExecutorPort, ToolInvocation};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, instrument};

/// Tool executor that answers from a table and records every call
#[derive(Debug, Default)]
pub struct ScriptedToolAdapter {
    outputs: HashMap<String, Option<String>>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl ScriptedToolAdapter {
    /// Create an adapter that knows no tools
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools for the selfie assistant demo
    pub fn selfie_defaults() -> Self {
        Self::new()
            .with_tool("capture_photo", Some("Photo captured"))
            .with_tool("toggle_flash", None)
    }

    /// Register a tool; `None` means it runs silently
    #[must_use]
    pub fn with_tool(mut self, name: impl Into<String>, output: Option<&str>) -> Self {
        self.outputs.insert(name.into(), output.map(str::to_string));
        self
    }

    /// Invocations received so far, oldest first
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ToolExecutorPort for ScriptedToolAdapter {
    #[instrument(skip(self, invocation), fields(tool = %invocation.name))]
    async fn execute(
        &self,
        invocation: ToolInvocation,
    ) -> Result<Option<String>, ApplicationError> {
        let output = self
            .outputs
            .get(&invocation.name)
            .cloned()
            .ok_or_else(|| {
                ApplicationError::ToolFailed(format!("Unknown tool: {}", invocation.name))
            })?;

        info!("Tool executed");
        self.calls.lock().push(invocation);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_tool_returns_output_and_is_recorded() {
        let adapter = ScriptedToolAdapter::selfie_defaults();

        let output = adapter
            .execute(ToolInvocation::new("capture_photo"))
            .await
            .unwrap();

        assert_eq!(output.as_deref(), Some("Photo captured"));
        assert_eq!(adapter.calls().len(), 1);
    }

    #[tokio::test]
    async fn silent_tool_returns_none() {
        let adapter = ScriptedToolAdapter::selfie_defaults();

        let output = adapter.execute(ToolInvocation::new("toggle_flash")).await.unwrap();

        assert!(output.is_none());
    }

    #[tokio::test]
    async fn unknown_tool_fails() {
        let adapter = ScriptedToolAdapter::new();

        let result = adapter.execute(ToolInvocation::new("launch_rocket")).await;

        assert!(matches!(result, Err(ApplicationError::ToolFailed(_))));
        assert!(adapter.calls().is_empty());
    }
}
