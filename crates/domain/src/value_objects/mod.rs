//! Value Objects - Immutable, identity-less domain primitives

mod speak_token;
mod transcript;

pub use speak_token::SpeakToken;
pub use transcript::{Transcript, normalize};
