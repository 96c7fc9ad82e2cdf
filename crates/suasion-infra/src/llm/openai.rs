//! OpenAI-compatible chat provider.
//!
//! Serves the OpenAI API and any endpoint speaking the same protocol via a
//! configurable base URL. Uses [`async_openai`] for type-safe
//! request/response handling and built-in SSE streaming.

use std::pin::Pin;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest, StopConfiguration,
};
use async_openai::Client;
use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};

use suasion_core::llm::ChatProvider;
use suasion_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, StopReason, StreamEvent, Usage,
};

use super::streaming::{map_finish_reason, map_openai_stream};

/// Chat provider for any OpenAI-compatible API.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
}

impl OpenAiProvider {
    /// Create an OpenAI provider against the default `api.openai.com` base.
    pub fn openai(api_key: &SecretString, model: &str) -> Self {
        Self::with_base_url(api_key, model, "https://api.openai.com/v1", "openai")
    }

    /// Create a provider against a custom OpenAI-compatible endpoint.
    pub fn with_base_url(
        api_key: &SecretString,
        model: &str,
        base_url: &str,
        provider_name: &str,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url);

        Self {
            client: Client::with_config(config),
            provider_name: provider_name.to_string(),
            model: model.to_string(),
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }

        for msg in &request.messages {
            let oai_msg = match msg.role {
                MessageRole::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    },
                ),
                MessageRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    },
                ),
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                                msg.content.clone(),
                            )),
                            refusal: None,
                            name: None,
                            audio: None,
                            tool_calls: None,
                            function_call: None,
                        },
                    )
                }
            };
            messages.push(oai_msg);
        }

        // Use the model from the request if set, otherwise the configured default.
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if let Some(ref stops) = request.stop_sequences {
            if !stops.is_empty() {
                req.stop = Some(StopConfiguration::StringArray(stops.clone()));
            }
        }

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }

        req
    }
}

impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request, false);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let stop_reason = response
            .choices
            .first()
            .and_then(|c| c.finish_reason.as_ref())
            .map(map_finish_reason)
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let oai_request = self.build_request(&request, true);

        // Clone the client for the 'static stream closure.
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);

            use futures_util::StreamExt;
            while let Some(event) = inner.next().await {
                match event {
                    Ok(ev) => yield ev,
                    Err(e) => Err(e)?,
                }
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                LlmError::ContextLengthExceeded {
                    max: 0,
                    requested: 0,
                }
            } else if code == "server_error" || error_type == "overloaded_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    401 => LlmError::AuthenticationFailed,
                    429 => LlmError::RateLimited {
                        retry_after_ms: None,
                    },
                    529 => LlmError::Overloaded(err.to_string()),
                    _ => LlmError::Provider {
                        message: err.to_string(),
                    },
                }
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => LlmError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}
