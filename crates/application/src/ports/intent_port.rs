//! Intent port - Interface for resolving free-form utterances
//!
//! Transcripts that match no registered command are handed to an intent
//! resolver (typically a language model with tool calling). The resolver
//! answers with tool invocations to run and/or a reply to speak.

use async_trait::async_trait;
use domain::VoiceStateSnapshot;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person in front of the camera
    User,
    /// The spoken assistant
    Assistant,
}

/// One entry of the rolling conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke
    pub speaker: Speaker,
    /// What was said
    pub text: String,
}

impl ConversationTurn {
    /// A user utterance
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    /// An assistant reply
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Input to intent resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentRequest {
    /// The finalized transcript
    pub transcript: String,
    /// Voice state at the time the transcript arrived
    pub state: VoiceStateSnapshot,
    /// Recent turns, oldest first
    pub history: Vec<ConversationTurn>,
}

/// A tool the resolver wants executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name
    pub name: String,
    /// Tool arguments as JSON
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    /// A tool call without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: serde_json::Value::Null,
        }
    }

    /// Attach JSON arguments
    #[must_use]
    pub fn with_arguments(mut self, arguments: serde_json::Value) -> Self {
        self.arguments = arguments;
        self
    }
}

/// Result of intent resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentResolution {
    /// Tools to run, in order
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
    /// Text to speak after the tools ran
    #[serde(default)]
    pub reply: Option<String>,
}

impl IntentResolution {
    /// A resolution that only speaks
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            tool_calls: Vec::new(),
            reply: Some(text.into()),
        }
    }

    /// Whether there is nothing to do
    pub fn is_empty(&self) -> bool {
        self.tool_calls.is_empty() && self.reply.as_deref().is_none_or(|r| r.trim().is_empty())
    }
}

/// Port for resolving unmatched transcripts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IntentResolverPort: Send + Sync {
    /// Resolve a transcript into tool calls and/or a reply
    async fn resolve(&self, request: IntentRequest) -> Result<IntentResolution, ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_deserializes_from_json() {
        let json = r#"{"tool_calls":[{"name":"take_photo"}],"reply":"Done"}"#;
        let resolution: IntentResolution = serde_json::from_str(json).unwrap();

        assert_eq!(resolution.tool_calls.len(), 1);
        assert_eq!(resolution.tool_calls[0].name, "take_photo");
        assert!(resolution.tool_calls[0].arguments.is_null());
        assert_eq!(resolution.reply.as_deref(), Some("Done"));
    }

    #[test]
    fn empty_resolution() {
        assert!(IntentResolution::default().is_empty());
        assert!(IntentResolution::reply("  ").is_empty());
        assert!(!IntentResolution::reply("Hi").is_empty());
    }

    #[tokio::test]
    async fn mock_resolver_returns_reply() {
        let mut mock = MockIntentResolverPort::new();
        mock.expect_resolve()
            .withf(|req| req.transcript == "how do I look")
            .returning(|_| Ok(IntentResolution::reply("Great")));

        let request = IntentRequest {
            transcript: "how do I look".to_string(),
            state: VoiceStateSnapshot {
                listening: true,
                tts_enabled: true,
                language: "en-US".to_string(),
            },
            history: vec![ConversationTurn::user("hello")],
        };
        let resolution = mock.resolve(request).await.unwrap();
        assert_eq!(resolution.reply.as_deref(), Some("Great"));
    }
}
