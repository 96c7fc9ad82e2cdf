//! The engine's exposed surface.

pub mod service;

pub use service::{ChatService, ChatSettings};
