//! Conversation phase, pairing, and configuration-binding authority.

pub mod machine;

pub use machine::{ConversationStateMachine, Layout};
