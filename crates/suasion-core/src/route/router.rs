//! Chat-mode dispatch.
//!
//! Classifies a user turn into a command branch or a mode branch. A slash
//! command on the last user message overrides the active chat mode. An
//! unmatched mode/command combination degrades to "persist history
//! unchanged" -- routing never fails.

use suasion_types::conversation::{ChatMessage, ChatMode};
use suasion_types::llm::MessageRole;

use super::commands::{extract_command, SlashCommand};

/// The resolved action for a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Run a streaming assistant turn over the history.
    StreamAssistant { follow_ups: bool },
    /// Generate an image from the prompt.
    GenerateImage { prompt: String },
    /// Run the tangent agent over the prompt.
    RunTangent { prompt: String },
    /// Remap the last message's role, strip the command token, persist.
    OverrideRole { role: MessageRole, text: String },
    /// Persist the history without calling the model.
    PersistOnly,
}

/// Classifies user turns; stateless.
pub struct CommandRouter;

impl CommandRouter {
    /// Resolve the action for the given chat mode and history.
    pub fn route(mode: ChatMode, history: &[ChatMessage]) -> Dispatch {
        let last_user_text = history
            .last()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.text.as_str());

        // A slash command on the last user message overrides the chat mode.
        if let Some(text) = last_user_text {
            if let Some((command, rest)) = extract_command(text) {
                return match command {
                    SlashCommand::Image if !rest.is_empty() => {
                        Dispatch::GenerateImage { prompt: rest }
                    }
                    SlashCommand::Tangent if !rest.is_empty() => {
                        Dispatch::RunTangent { prompt: rest }
                    }
                    SlashCommand::Role(role) => Dispatch::OverrideRole { role, text: rest },
                    // Command with no argument text: nothing to act on.
                    SlashCommand::Image | SlashCommand::Tangent => Dispatch::PersistOnly,
                };
            }
        }

        match mode {
            ChatMode::Immediate => Dispatch::StreamAssistant { follow_ups: false },
            ChatMode::ImmediateFollowUp => Dispatch::StreamAssistant { follow_ups: true },
            ChatMode::WriteUser => Dispatch::PersistOnly,
            ChatMode::Tangent => match last_user_text {
                Some(text) if !text.is_empty() => Dispatch::RunTangent {
                    prompt: text.to_string(),
                },
                _ => Dispatch::PersistOnly,
            },
            ChatMode::DrawImagine => match last_user_text {
                Some(text) if !text.is_empty() => Dispatch::GenerateImage {
                    prompt: text.to_string(),
                },
                _ => Dispatch::PersistOnly,
            },
        }
    }
}
