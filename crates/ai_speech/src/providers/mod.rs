//! Speech engine implementations
//!
//! Contains in-process engines implementing the platform ports. Real
//! platform bindings live with the host application.

pub mod simulated;

pub use simulated::{SimulatedActivityEngine, SimulatedRecognitionEngine, SimulatedSynthesisEngine};
