//! User-turn classification: slash commands and chat-mode dispatch.

pub mod commands;
pub mod router;

pub use commands::{extract_command, SlashCommand};
pub use router::{CommandRouter, Dispatch};
