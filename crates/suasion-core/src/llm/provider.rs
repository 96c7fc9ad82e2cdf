//! ChatProvider trait definition.
//!
//! The streaming-completion boundary the turn executor talks to. Uses
//! RPITIT for `complete` and `Pin<Box<dyn Stream>>` for `stream` (streams
//! need to be object-safe for the BoxChatProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use suasion_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Trait for model-inference backends.
///
/// Implementations live in suasion-infra (e.g., the OpenAI-compatible
/// provider). Streams must deliver monotonically growing text and tolerate
/// the consumer dropping them mid-flight (cooperative cancellation).
pub trait ChatProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxChatProvider` wrapper.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
