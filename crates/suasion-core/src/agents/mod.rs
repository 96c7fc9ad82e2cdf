//! Auxiliary agent boundaries: image generation and the tangent agent.
//!
//! Both are optional collaborators. When one is absent, the command router's
//! matching dispatch degrades to "persist history unchanged". Neither may
//! trigger a full assistant turn.

use std::future::Future;
use std::pin::Pin;

use suasion_types::error::AgentError;

/// Trait for image-generation backends (the `/draw` family).
pub trait ImageGenerator: Send + Sync {
    /// Generate an image from the prompt; returns a text block (typically a
    /// markdown image link) to store as the assistant message.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, AgentError>> + Send;
}

/// Trait for the tangent agent (the `/react` command): a bounded
/// reason-and-act loop answering a one-off question outside the dialogue.
pub trait TangentAgent: Send + Sync {
    /// Run the tangent loop over the prompt; returns the final answer text.
    fn run(&self, prompt: &str) -> impl Future<Output = Result<String, AgentError>> + Send;
}

/// Object-safe version of [`ImageGenerator`] with boxed futures.
pub trait ImageGeneratorDyn: Send + Sync {
    fn generate_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AgentError>> + Send + 'a>>;
}

impl<T: ImageGenerator> ImageGeneratorDyn for T {
    fn generate_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AgentError>> + Send + 'a>> {
        Box::pin(self.generate(prompt))
    }
}

/// Object-safe version of [`TangentAgent`] with boxed futures.
pub trait TangentAgentDyn: Send + Sync {
    fn run_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AgentError>> + Send + 'a>>;
}

impl<T: TangentAgent> TangentAgentDyn for T {
    fn run_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AgentError>> + Send + 'a>> {
        Box::pin(self.run(prompt))
    }
}

/// Type-erased image generator.
pub struct BoxImageGenerator {
    inner: Box<dyn ImageGeneratorDyn + Send + Sync>,
}

impl BoxImageGenerator {
    pub fn new<T: ImageGenerator + 'static>(generator: T) -> Self {
        Self {
            inner: Box::new(generator),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        self.inner.generate_boxed(prompt).await
    }
}

/// Type-erased tangent agent.
pub struct BoxTangentAgent {
    inner: Box<dyn TangentAgentDyn + Send + Sync>,
}

impl BoxTangentAgent {
    pub fn new<T: TangentAgent + 'static>(agent: T) -> Self {
        Self {
            inner: Box::new(agent),
        }
    }

    pub async fn run(&self, prompt: &str) -> Result<String, AgentError> {
        self.inner.run_boxed(prompt).await
    }
}
