//! Canned intent adapter - Keyword rules instead of a language model
//!
//! Stands in for a real intent resolver in demos and offline mode. Rules are
//! checked in order against the normalized transcript; the first rule whose
//! keyword occurs wins. Without a match the fallback reply is used.

use application::error::ApplicationError;
use application::ports::{IntentRequest, IntentResolution, IntentResolverPort, ToolInvocation};
use async_trait::async_trait;
use domain::normalize;
use tracing::{debug, instrument};

/// One keyword rule
#[derive(Debug, Clone)]
struct CannedRule {
    keyword: String,
    tool: Option<String>,
    reply: Option<String>,
}

/// Intent resolver backed by keyword rules
#[derive(Debug, Clone, Default)]
pub struct CannedIntentAdapter {
    rules: Vec<CannedRule>,
    fallback: Option<String>,
}

impl CannedIntentAdapter {
    /// Create an adapter with no rules and no fallback
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the selfie assistant demo
    pub fn selfie_defaults() -> Self {
        Self::new()
            .with_tool_rule("picture", "capture_photo")
            .with_tool_rule("selfie", "capture_photo")
            .with_reply_rule(
                "how do i look",
                "You look great. Tilt your chin down a little for the light.",
            )
            .with_reply_rule("help", "Say take photo, or ask me how you look.")
            .with_fallback("Sorry, I did not catch that.")
    }

    /// Reply with `reply` when `keyword` occurs
    #[must_use]
    pub fn with_reply_rule(mut self, keyword: &str, reply: impl Into<String>) -> Self {
        self.rules.push(CannedRule {
            keyword: normalize(keyword),
            tool: None,
            reply: Some(reply.into()),
        });
        self
    }

    /// Invoke `tool` when `keyword` occurs
    #[must_use]
    pub fn with_tool_rule(mut self, keyword: &str, tool: impl Into<String>) -> Self {
        self.rules.push(CannedRule {
            keyword: normalize(keyword),
            tool: Some(tool.into()),
            reply: None,
        });
        self
    }

    /// Reply used when no rule matches
    #[must_use]
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }
}

#[async_trait]
impl IntentResolverPort for CannedIntentAdapter {
    #[instrument(skip(self, request), fields(transcript = %request.transcript))]
    async fn resolve(&self, request: IntentRequest) -> Result<IntentResolution, ApplicationError> {
        let text = normalize(&request.transcript);
        let Some(rule) = self
            .rules
            .iter()
            .find(|rule| !rule.keyword.is_empty() && text.contains(&rule.keyword))
        else {
            debug!("No canned rule matched");
            return Ok(IntentResolution {
                tool_calls: Vec::new(),
                reply: self.fallback.clone(),
            });
        };

        debug!(keyword = %rule.keyword, "Canned rule matched");
        Ok(IntentResolution {
            tool_calls: rule.tool.iter().map(ToolInvocation::new).collect(),
            reply: rule.reply.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use domain::VoiceStateSnapshot;

    use super::*;

    fn request(text: &str) -> IntentRequest {
        IntentRequest {
            transcript: text.to_string(),
            state: VoiceStateSnapshot {
                listening: true,
                tts_enabled: true,
                language: "en-US".to_string(),
            },
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn first_matching_rule_wins() {
        let adapter = CannedIntentAdapter::new()
            .with_reply_rule("look", "First")
            .with_reply_rule("how do i look", "Second");

        let resolution = adapter.resolve(request("How do I look?")).await.unwrap();

        assert_eq!(resolution.reply.as_deref(), Some("First"));
        assert!(resolution.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn tool_rule_produces_invocation() {
        let adapter = CannedIntentAdapter::selfie_defaults();

        let resolution = adapter.resolve(request("Grab a selfie")).await.unwrap();

        assert_eq!(resolution.tool_calls.len(), 1);
        assert_eq!(resolution.tool_calls[0].name, "capture_photo");
        assert!(resolution.reply.is_none());
    }

    #[tokio::test]
    async fn unmatched_uses_fallback() {
        let adapter = CannedIntentAdapter::new().with_fallback("Pardon?");

        let resolution = adapter.resolve(request("sing a song")).await.unwrap();

        assert_eq!(resolution, IntentResolution::reply("Pardon?"));
    }

    #[tokio::test]
    async fn unmatched_without_fallback_is_empty() {
        let adapter = CannedIntentAdapter::new();

        let resolution = adapter.resolve(request("anything")).await.unwrap();

        assert!(resolution.is_empty());
    }
}
