//! Conversation title generation via LLM.
//!
//! `generate_title` creates a short, descriptive title for a conversation
//! based on the first user-assistant exchange.

use suasion_types::llm::{CompletionRequest, LlmError, Message, MessageRole};

use crate::llm::BoxChatProvider;

/// System prompt for the title generation LLM call.
const TITLE_SYSTEM_PROMPT: &str = r#"Generate a short, descriptive title (3-7 words) for this conversation based on the first exchange. The title should capture the main topic or intent. Return ONLY the title text, nothing else.

Examples:
- "Phones in classrooms debate"
- "Planning a weekend trip to Tokyo"
- "Understanding quantum computing basics"
- "Drafting an opinion memo""#;

/// Generate a conversation title from the first user-assistant exchange.
///
/// Uses a non-streaming call at low temperature (0.3) with a strict prompt
/// to produce a concise title. The result is trimmed of whitespace and
/// surrounding quotes.
#[tracing::instrument(
    name = "generate_title",
    skip(provider, first_user_message, first_assistant_message),
    fields(model = %model)
)]
pub async fn generate_title(
    provider: &BoxChatProvider,
    first_user_message: &str,
    first_assistant_message: &str,
    model: &str,
) -> Result<String, LlmError> {
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![
            Message {
                role: MessageRole::User,
                content: first_user_message.to_string(),
            },
            Message {
                role: MessageRole::Assistant,
                content: first_assistant_message.to_string(),
            },
            Message {
                role: MessageRole::User,
                content: "Based on our exchange above, generate a title.".to_string(),
            },
        ],
        system: Some(TITLE_SYSTEM_PROMPT.to_string()),
        max_tokens: 50,
        temperature: Some(0.3),
        stream: false,
        stop_sequences: None,
    };

    let response = provider.complete(&request).await?;

    // Trim whitespace and surrounding quotes from the title
    let title = response
        .content
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string();

    Ok(title)
}
