//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to the
//! provider-agnostic [`StreamEvent`] enum defined in `suasion-types`.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use async_openai::types::chat::{ChatCompletionResponseStream, FinishReason};

use suasion_types::llm::{LlmError, StopReason, StreamEvent, Usage};

/// Map an async-openai [`ChatCompletionResponseStream`] to a stream of [`StreamEvent`]s.
///
/// The returned stream emits events in this order:
/// 1. `Connected` -- immediately on entry
/// 2. `TextDelta` -- for each text content chunk
/// 3. `MessageDelta` -- with the stop reason when finish_reason appears
/// 4. `Usage` -- token usage (requires `stream_options.include_usage = true`)
/// 5. `Done` -- at the end of the stream
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            // The final chunk carries usage data with an empty choices array.
            if let Some(ref usage) = chunk.usage {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in &chunk.choices {
                if let Some(ref text) = choice.delta.content {
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta {
                            index: 0,
                            text: text.clone(),
                        };
                    }
                }

                if let Some(ref finish_reason) = choice.finish_reason {
                    yield StreamEvent::MessageDelta {
                        stop_reason: map_finish_reason(finish_reason),
                    };
                }
            }
        }

        yield StreamEvent::Done;
    })
}

/// Map an OpenAI finish reason onto the engine's stop reasons.
pub(crate) fn map_finish_reason(finish_reason: &FinishReason) -> StopReason {
    match finish_reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        // No tool calling in this engine; treat the remaining reasons as a
        // normal end of turn.
        FinishReason::ToolCalls | FinishReason::FunctionCall | FinishReason::ContentFilter => {
            StopReason::EndTurn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(&FinishReason::Stop), StopReason::EndTurn);
        assert_eq!(
            map_finish_reason(&FinishReason::Length),
            StopReason::MaxTokens
        );
        assert_eq!(
            map_finish_reason(&FinishReason::ToolCalls),
            StopReason::EndTurn
        );
        assert_eq!(
            map_finish_reason(&FinishReason::ContentFilter),
            StopReason::EndTurn
        );
    }
}
