//! Adapters implementing application ports

mod canned_intent_adapter;
mod scripted_tool_adapter;

pub use canned_intent_adapter::CannedIntentAdapter;
pub use scripted_tool_adapter::ScriptedToolAdapter;
