//! Speech-synthesis boundary.
//!
//! Consumed fire-and-forget by the turn executor's first-line side channel;
//! failures are logged by the spawned task and never reach the turn.

use std::future::Future;
use std::pin::Pin;

use suasion_types::error::SpeechError;

/// Trait for speech-synthesis backends.
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize and play the given text.
    fn speak(&self, text: &str) -> impl Future<Output = Result<(), SpeechError>> + Send;
}

/// Object-safe version of [`SpeechSynthesizer`] with boxed futures.
pub trait SpeechSynthesizerDyn: Send + Sync {
    fn speak_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SpeechError>> + Send + 'a>>;
}

/// Blanket implementation: any `SpeechSynthesizer` automatically implements
/// `SpeechSynthesizerDyn`.
impl<T: SpeechSynthesizer> SpeechSynthesizerDyn for T {
    fn speak_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SpeechError>> + Send + 'a>> {
        Box::pin(self.speak(text))
    }
}

/// Type-erased speech synthesizer.
pub struct BoxSpeechSynthesizer {
    inner: Box<dyn SpeechSynthesizerDyn + Send + Sync>,
}

impl BoxSpeechSynthesizer {
    /// Wrap a concrete `SpeechSynthesizer` in a type-erased box.
    pub fn new<T: SpeechSynthesizer + 'static>(synthesizer: T) -> Self {
        Self {
            inner: Box::new(synthesizer),
        }
    }

    /// Synthesize and play the given text.
    pub async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.inner.speak_boxed(text).await
    }
}
