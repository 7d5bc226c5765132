//! AI Speech - wrappers around platform speech engines
//!
//! Provides concurrency-safe wrappers over raw recognition, synthesis and
//! voice-activity engines:
//! - [`RecognitionSession`] - idempotent start/stop with a stop guard
//! - [`SynthesisGate`] - one utterance at a time, with a completion timeout
//! - [`VoiceDetector`] - tracked lifecycle for activity detectors
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the raw engine traits (ports)
//! - `providers` module contains simulated implementations (adapters)
//!
//! Engines report lifecycle signals through sink handles
//! ([`RecognitionSink`], [`SynthesisSink`], [`ActivitySink`]) rather than
//! callbacks, and the wrappers publish typed events on broadcast channels.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ai_speech::{RecognitionSession, SimulatedRecognitionEngine, SpeechConfig};
//!
//! let session = RecognitionSession::new(
//!     Arc::new(SimulatedRecognitionEngine::new()),
//!     SpeechConfig::default(),
//! );
//! let mut events = session.subscribe();
//!
//! assert!(session.start().await);
//! assert!(session.stop().await);
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod ports;
pub mod providers;
pub mod recognition;
pub mod synthesis;
pub mod types;

pub use config::SpeechConfig;
pub use detector::{ActivitySink, VoiceDetector};
pub use error::SpeechError;
pub use ports::{RecognitionEngine, SynthesisEngine, VoiceActivityEngine};
pub use providers::simulated::{
    SimulatedActivityEngine, SimulatedRecognitionEngine, SimulatedSynthesisEngine,
};
pub use recognition::{RecognitionSession, RecognitionSink};
pub use synthesis::{SynthesisGate, SynthesisSink};
pub use types::{DetectorEvent, RecognitionEvent, SpeakOptions, Utterance};
