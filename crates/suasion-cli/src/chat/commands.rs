//! Session-level slash commands for the chat loop.
//!
//! These control the REPL itself. Anything not recognized here (including
//! the engine commands `/react`, `/draw`, and the role overrides) passes
//! through to the conversation engine untouched.

use std::str::FromStr;

use console::style;
use suasion_types::conversation::ChatMode;

/// Commands handled by the chat loop.
#[derive(Debug, PartialEq)]
pub enum SessionCommand {
    /// Show available commands.
    Help,
    /// Exit the session.
    Exit,
    /// Start a fresh dialogue conversation.
    New,
    /// Toggle between the dialogue and its paired memo.
    Memo,
    /// Bind topic, standpoint, and strategy: `/topic topic | standpoint | strategy`.
    Topic {
        topic: String,
        standpoint: String,
        strategy: String,
    },
    /// Switch the dispatch mode: `/mode immediate-follow-up`.
    Mode(ChatMode),
    /// Abort the in-flight turn.
    Abort,
    /// Show recent conversation history.
    History,
}

/// Parse a session command.
///
/// Returns `None` when the input should be sent to the engine instead --
/// plain text and engine-level commands alike.
pub fn parse(input: &str) -> Option<SessionCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (token, rest) = match trimmed.split_once(' ') {
        Some((token, rest)) => (token, rest.trim()),
        None => (trimmed, ""),
    };

    match token.to_lowercase().as_str() {
        "/help" | "/h" | "/?" => Some(SessionCommand::Help),
        "/exit" | "/quit" | "/q" => Some(SessionCommand::Exit),
        "/new" => Some(SessionCommand::New),
        "/memo" => Some(SessionCommand::Memo),
        "/abort" => Some(SessionCommand::Abort),
        "/history" => Some(SessionCommand::History),
        "/mode" => ChatMode::from_str(rest).ok().map(SessionCommand::Mode),
        "/topic" => {
            let mut parts = rest.splitn(3, '|').map(str::trim);
            let topic = parts.next().unwrap_or_default();
            if topic.is_empty() {
                return None;
            }
            Some(SessionCommand::Topic {
                topic: topic.to_string(),
                standpoint: parts.next().unwrap_or_default().to_string(),
                strategy: parts.next().unwrap_or_default().to_string(),
            })
        }
        _ => None,
    }
}

/// Print the help text listing all session commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Session commands:").bold());
    println!();
    println!("  {}     {}", style("/help").cyan(), "Show this help message");
    println!("  {}     {}", style("/exit").cyan(), "End the session");
    println!("  {}      {}", style("/new").cyan(), "Start a fresh dialogue");
    println!(
        "  {}     {}",
        style("/memo").cyan(),
        "Toggle between dialogue and opinion memo"
    );
    println!(
        "  {}    {}",
        style("/topic").cyan(),
        "Bind topic | standpoint | strategy"
    );
    println!(
        "  {}     {}",
        style("/mode").cyan(),
        "Set dispatch mode (immediate, immediate-follow-up, write-user, ...)"
    );
    println!("  {}    {}", style("/abort").cyan(), "Abort the in-flight turn");
    println!("  {}  {}", style("/history").cyan(), "Show recent messages");
    println!();
    println!(
        "  {}",
        style("Engine commands pass through: /react <question>, /draw <prompt>, /s /a /u <text>").dim()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(parse("/help"), Some(SessionCommand::Help));
        assert_eq!(parse("/exit"), Some(SessionCommand::Exit));
        assert_eq!(parse("/memo"), Some(SessionCommand::Memo));
        assert_eq!(parse("/abort"), Some(SessionCommand::Abort));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(
            parse("/mode immediate-follow-up"),
            Some(SessionCommand::Mode(ChatMode::ImmediateFollowUp))
        );
        assert_eq!(parse("/mode bogus"), None);
    }

    #[test]
    fn test_parse_topic_with_directives() {
        let cmd = parse("/topic Cell phones in schools | opposing | clarification").unwrap();
        assert_eq!(
            cmd,
            SessionCommand::Topic {
                topic: "Cell phones in schools".to_string(),
                standpoint: "opposing".to_string(),
                strategy: "clarification".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_topic_alone() {
        let cmd = parse("/topic Cell phones in schools").unwrap();
        assert_eq!(
            cmd,
            SessionCommand::Topic {
                topic: "Cell phones in schools".to_string(),
                standpoint: String::new(),
                strategy: String::new(),
            }
        );
    }

    #[test]
    fn test_engine_commands_pass_through() {
        assert_eq!(parse("/react find the capital of France"), None);
        assert_eq!(parse("/draw a cat"), None);
        assert_eq!(parse("/s be terse"), None);
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(parse("hello there"), None);
    }
}
