//! Speech-synthesis implementations.

pub mod elevenlabs;

pub use elevenlabs::ElevenLabsSpeech;
