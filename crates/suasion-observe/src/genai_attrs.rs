//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent LLM call instrumentation across the codebase. All constants
//! are string slices usable in `tracing::span!` and `tracing::info_span!`
//! field names.
//!
//! Span naming convention: `"{operation} {model}"` (e.g., `"chat gpt-4o"`)

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "openai").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "gpt-4o").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reasons for the response (e.g., "end_turn").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Auto-title generation for a conversation.
pub const OP_GENERATE_TITLE: &str = "generate_title";

/// Follow-up suggestion generation.
pub const OP_GENERATE_SUGGESTIONS: &str = "generate_suggestions";

// --- Provider name values ---

/// OpenAI provider identifier.
pub const PROVIDER_OPENAI: &str = "openai";

/// Span name for an LLM operation per the semconv: `"{operation} {model}"`.
pub fn span_name(operation: &str, model: &str) -> String {
    format!("{operation} {model}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_name_convention() {
        assert_eq!(span_name(OP_CHAT, "gpt-4o"), "chat gpt-4o");
    }
}
