//! BoxChatProvider -- object-safe dynamic dispatch wrapper for ChatProvider.
//!
//! 1. Define an object-safe `ChatProviderDyn` trait with boxed futures
//! 2. Blanket-impl `ChatProviderDyn` for all `T: ChatProvider`
//! 3. `BoxChatProvider` wraps `Box<dyn ChatProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use suasion_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

use super::provider::ChatProvider;

/// Object-safe version of [`ChatProvider`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn ChatProviderDyn`).
/// A blanket implementation is provided for all types implementing `ChatProvider`.
pub trait ChatProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

    fn stream_boxed(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}

/// Blanket implementation: any `ChatProvider` automatically implements `ChatProviderDyn`.
impl<T: ChatProvider> ChatProviderDyn for T {
    fn name(&self) -> &str {
        ChatProvider::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }

    fn stream_boxed(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.stream(request)
    }
}

/// Type-erased chat provider for runtime provider selection.
///
/// Since `ChatProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxChatProvider` provides equivalent methods that delegate to
/// the inner `ChatProviderDyn` trait object.
pub struct BoxChatProvider {
    inner: Box<dyn ChatProviderDyn + Send + Sync>,
}

impl BoxChatProvider {
    /// Wrap a concrete `ChatProvider` in a type-erased box.
    pub fn new<T: ChatProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send a completion request and receive the full response.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        self.inner.complete_boxed(request).await
    }

    /// Send a streaming completion request. Returns a stream of events.
    pub fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.inner.stream_boxed(request)
    }
}
