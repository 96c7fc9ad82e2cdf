//! Slash-command extraction for user turns.
//!
//! A user message may lead with a command token followed by free text.
//! Three disjoint families exist: image generation, the tangent agent, and
//! role overrides. A leading `/token` that matches no family is treated as
//! plain text, never an error.

use suasion_types::llm::MessageRole;

/// Commands that trigger image generation.
pub const CMD_IMAGE: &[&str] = &["/draw", "/imagine", "/img"];

/// Commands that trigger the tangent agent.
pub const CMD_TANGENT: &[&str] = &["/react"];

/// Commands that remap the message role and strip the token.
pub const CMD_ROLE: &[&str] = &["/system", "/s", "/assistant", "/a", "/user", "/u"];

/// A recognized slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// Generate an image from the remaining text.
    Image,
    /// Run the tangent agent over the remaining text.
    Tangent,
    /// Persist the remaining text under the given role.
    Role(MessageRole),
}

/// Split an optional leading command token from the message text.
///
/// Returns the command and the remaining free text, or `None` when the
/// message does not start with a recognized command.
pub fn extract_command(text: &str) -> Option<(SlashCommand, String)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (token, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim().to_string()),
        None => (trimmed, String::new()),
    };
    let token_lower = token.to_lowercase();

    if CMD_IMAGE.contains(&token_lower.as_str()) {
        return Some((SlashCommand::Image, rest));
    }
    if CMD_TANGENT.contains(&token_lower.as_str()) {
        return Some((SlashCommand::Tangent, rest));
    }
    if CMD_ROLE.contains(&token_lower.as_str()) {
        // Role is derived from the command prefix: /s* -> system,
        // /a* -> assistant, anything else in the family -> user.
        let role = if token_lower.starts_with("/s") {
            MessageRole::System
        } else if token_lower.starts_with("/a") {
            MessageRole::Assistant
        } else {
            MessageRole::User
        };
        return Some((SlashCommand::Role(role), rest));
    }

    None
}
