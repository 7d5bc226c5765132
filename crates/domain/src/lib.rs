//! Domain layer for the selfie voice assistant
//!
//! Contains the listening/recognition state machines, speak tokens,
//! transcripts and capability snapshots shared by every other crate.
//! This layer performs no I/O and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
