//! Command router - Match finished transcripts against registered commands
//!
//! Commands are registered at runtime with a [`CommandPattern`] and an async
//! handler. Every command whose pattern matches a transcript fires once; the
//! orchestrator forwards transcripts that match nothing to the intent
//! resolver.

mod patterns;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use domain::{Transcript, normalize};
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

pub use patterns::{AnyOfMatcher, CommandPattern};

use crate::services::SpeechOrchestrator;

/// Identifier returned by [`CommandRouter::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

/// Everything a command handler receives
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    /// Name the command was registered under
    pub command: String,
    /// The transcript that triggered it
    pub transcript: Transcript,
    /// Handle for speaking, asking follow-up questions and so on
    pub orchestrator: SpeechOrchestrator,
}

/// Type-erased async command handler
pub type CommandHandler = Arc<dyn Fn(CommandInvocation) -> BoxFuture<'static, ()> + Send + Sync>;

struct Registration {
    id: CommandId,
    name: String,
    pattern: CommandPattern,
    handler: CommandHandler,
}

/// A command selected for a transcript
#[derive(Clone)]
pub struct MatchedCommand {
    /// Registration id
    pub id: CommandId,
    /// Registered name
    pub name: String,
    /// Handler to run
    pub handler: CommandHandler,
}

impl fmt::Debug for MatchedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchedCommand")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of voice commands
#[derive(Default)]
pub struct CommandRouter {
    registrations: Vec<Registration>,
    next_id: u64,
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter")
            .field("commands", &self.registrations.iter().map(|r| &r.name).collect::<Vec<_>>())
            .finish()
    }
}

impl CommandRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command; registration order is dispatch order
    pub fn register<F, Fut>(
        &mut self,
        name: impl Into<String>,
        pattern: CommandPattern,
        handler: F,
    ) -> CommandId
    where
        F: Fn(CommandInvocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.next_id += 1;
        let id = CommandId(self.next_id);
        let name = name.into();
        debug!(%id, name = %name, pattern = ?pattern, "Registered voice command");
        self.registrations.push(Registration {
            id,
            name,
            pattern,
            handler: Arc::new(move |invocation| handler(invocation).boxed()),
        });
        id
    }

    /// Remove a command, returning whether it was registered
    pub fn unregister(&mut self, id: CommandId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }

    /// All commands matching `text`
    pub fn matches(&self, text: &str) -> Vec<MatchedCommand> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Vec::new();
        }
        self.registrations
            .iter()
            .filter(|r| r.pattern.matches(&normalized))
            .map(|r| MatchedCommand {
                id: r.id,
                name: r.name.clone(),
                handler: Arc::clone(&r.handler),
            })
            .collect()
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no command is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
