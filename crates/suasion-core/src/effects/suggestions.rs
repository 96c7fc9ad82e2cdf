//! Follow-up suggestion generation via LLM.
//!
//! Proposes up to three short follow-up questions the user could ask next,
//! derived from the finalized assistant message.

use suasion_types::llm::{CompletionRequest, LlmError, Message, MessageRole};

use crate::llm::BoxChatProvider;

/// Maximum number of suggestions attached to a message.
pub const MAX_SUGGESTIONS: usize = 3;

const SUGGESTIONS_SYSTEM_PROMPT: &str = "\
Propose up to three short follow-up questions the user could ask next, based on the \
assistant's last response. Each question must stand on its own and invite the user to \
continue the conversation. Return one question per line, with no numbering, bullets, \
or commentary.";

/// Generate follow-up suggestions for the given assistant message text.
///
/// Returns at most [`MAX_SUGGESTIONS`] non-empty lines, stripped of any
/// list markers the model added anyway.
#[tracing::instrument(
    name = "generate_suggestions",
    skip(provider, assistant_text),
    fields(model = %model)
)]
pub async fn generate_suggestions(
    provider: &BoxChatProvider,
    assistant_text: &str,
    model: &str,
) -> Result<Vec<String>, LlmError> {
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![Message {
            role: MessageRole::User,
            content: format!("Assistant's last response:\n\n{assistant_text}"),
        }],
        system: Some(SUGGESTIONS_SYSTEM_PROMPT.to_string()),
        max_tokens: 200,
        temperature: Some(0.7),
        stream: false,
        stop_sequences: None,
    };

    let response = provider.complete(&request).await?;
    Ok(parse_suggestions(&response.content))
}

/// Split a response into clean suggestion lines.
fn parse_suggestions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_lines() {
        let suggestions = parse_suggestions(
            "What about privacy concerns?\nHow do other schools handle this?\n",
        );
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0], "What about privacy concerns?");
    }

    #[test]
    fn test_parse_strips_list_markers() {
        let suggestions = parse_suggestions("- First question?\n2. Second question?\n* Third?");
        assert_eq!(
            suggestions,
            vec!["First question?", "Second question?", "Third?"]
        );
    }

    #[test]
    fn test_parse_caps_at_three() {
        let suggestions = parse_suggestions("a?\nb?\nc?\nd?\ne?");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let suggestions = parse_suggestions("\n\nonly one?\n\n");
        assert_eq!(suggestions, vec!["only one?"]);
    }
}
