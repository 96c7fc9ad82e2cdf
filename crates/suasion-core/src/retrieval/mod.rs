//! Context-retrieval boundary.
//!
//! Best-effort grounding of a dialogue turn with snippets from an external
//! knowledge index. The same Dyn/blanket/Box pattern as the chat provider.

use std::future::Future;
use std::pin::Pin;

use suasion_types::conversation::ChatMessage;
use suasion_types::retrieval::{RetrievalError, RetrievalOutcome};

/// Trait for retrieval-augmentation backends.
///
/// Implementations live in suasion-infra. Retrieval is best-effort: any
/// error is absorbed by the turn executor, which falls back to the
/// unaugmented prompt.
pub trait ContextRetriever: Send + Sync {
    /// Retrieve grounding context for the given query and history.
    fn retrieve(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> impl Future<Output = Result<RetrievalOutcome, RetrievalError>> + Send;
}

/// Object-safe version of [`ContextRetriever`] with boxed futures.
pub trait ContextRetrieverDyn: Send + Sync {
    fn retrieve_boxed<'a>(
        &'a self,
        query: &'a str,
        history: &'a [ChatMessage],
    ) -> Pin<Box<dyn Future<Output = Result<RetrievalOutcome, RetrievalError>> + Send + 'a>>;
}

/// Blanket implementation: any `ContextRetriever` automatically implements
/// `ContextRetrieverDyn`.
impl<T: ContextRetriever> ContextRetrieverDyn for T {
    fn retrieve_boxed<'a>(
        &'a self,
        query: &'a str,
        history: &'a [ChatMessage],
    ) -> Pin<Box<dyn Future<Output = Result<RetrievalOutcome, RetrievalError>> + Send + 'a>> {
        Box::pin(self.retrieve(query, history))
    }
}

/// Type-erased context retriever.
pub struct BoxContextRetriever {
    inner: Box<dyn ContextRetrieverDyn + Send + Sync>,
}

impl BoxContextRetriever {
    /// Wrap a concrete `ContextRetriever` in a type-erased box.
    pub fn new<T: ContextRetriever + 'static>(retriever: T) -> Self {
        Self {
            inner: Box::new(retriever),
        }
    }

    /// Retrieve grounding context for the given query and history.
    pub async fn retrieve(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<RetrievalOutcome, RetrievalError> {
        self.inner.retrieve_boxed(query, history).await
    }
}
