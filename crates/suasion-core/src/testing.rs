//! Test doubles shared by the engine's unit tests.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::Stream;
use uuid::Uuid;

use suasion_types::conversation::{ChatMessage, Conversation, MessagePatch, PersuasionConfig};
use suasion_types::error::{SpeechError, StoreError};
use suasion_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};
use suasion_types::retrieval::{RetrievalError, RetrievalOutcome};

use crate::llm::ChatProvider;
use crate::retrieval::ContextRetriever;
use crate::speech::SpeechSynthesizer;
use crate::store::ConversationStore;

/// Mutex-backed in-memory store for tests.
#[derive(Default)]
pub(crate) struct MemStore {
    conversations: Mutex<HashMap<Uuid, Conversation>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversation(conversation: Conversation) -> (Arc<Self>, Uuid) {
        let id = conversation.id;
        let store = Self::new();
        store
            .conversations
            .lock()
            .unwrap()
            .insert(id, conversation);
        (Arc::new(store), id)
    }

    pub fn conversation(&self, id: &Uuid) -> Option<Conversation> {
        self.conversations.lock().unwrap().get(id).cloned()
    }

    pub fn message(&self, conversation_id: &Uuid, message_id: &Uuid) -> Option<ChatMessage> {
        self.conversation(conversation_id)?
            .messages
            .into_iter()
            .find(|m| m.id == *message_id)
    }

    fn update<R>(
        &self,
        conversation_id: &Uuid,
        f: impl FnOnce(&mut Conversation) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.conversations.lock().unwrap();
        let conversation = guard
            .get_mut(conversation_id)
            .ok_or(StoreError::ConversationNotFound)?;
        f(conversation)
    }
}

impl ConversationStore for MemStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.conversations
            .lock()
            .unwrap()
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self.conversation(conversation_id))
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let mut all: Vec<Conversation> =
            self.conversations.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|c| c.created_at);
        Ok(all)
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        self.update(conversation_id, |c| {
            c.messages.push(message.clone());
            Ok(())
        })
    }

    async fn patch_message(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        patch: &MessagePatch,
    ) -> Result<(), StoreError> {
        self.update(conversation_id, |c| {
            let message = c
                .messages
                .iter_mut()
                .find(|m| m.id == *message_id)
                .ok_or(StoreError::MessageNotFound)?;
            patch.apply(message);
            Ok(())
        })
    }

    async fn replace_messages(
        &self,
        conversation_id: &Uuid,
        messages: &[ChatMessage],
    ) -> Result<(), StoreError> {
        self.update(conversation_id, |c| {
            c.messages = messages.to_vec();
            Ok(())
        })
    }

    async fn bind_config(
        &self,
        conversation_id: &Uuid,
        config: &PersuasionConfig,
    ) -> Result<(), StoreError> {
        self.update(conversation_id, |c| {
            if c.config.is_bound() {
                return Err(StoreError::ConfigBound);
            }
            c.config = config.clone();
            Ok(())
        })
    }

    async fn set_initial_system_message(
        &self,
        conversation_id: &Uuid,
        text: &str,
    ) -> Result<(), StoreError> {
        self.update(conversation_id, |c| {
            if c.initial_system_message.is_none() {
                c.initial_system_message = Some(text.to_string());
            }
            Ok(())
        })
    }

    async fn set_auto_title(&self, conversation_id: &Uuid, title: &str) -> Result<(), StoreError> {
        self.update(conversation_id, |c| {
            c.auto_title = Some(title.to_string());
            Ok(())
        })
    }

    async fn pair_memo(&self, dialogue_id: &Uuid, memo_id: &Uuid) -> Result<(), StoreError> {
        let mut guard = self.conversations.lock().unwrap();
        {
            let dialogue = guard
                .get(dialogue_id)
                .ok_or(StoreError::ConversationNotFound)?;
            let memo = guard.get(memo_id).ok_or(StoreError::ConversationNotFound)?;
            if dialogue.paired_memo_id.is_some() || memo.paired_dialogue_id.is_some() {
                return Err(StoreError::Conflict("already paired".to_string()));
            }
        }
        guard.get_mut(dialogue_id).unwrap().paired_memo_id = Some(*memo_id);
        guard.get_mut(memo_id).unwrap().paired_dialogue_id = Some(*dialogue_id);
        Ok(())
    }
}

/// Scripted step for [`ScriptedProvider`] streams.
#[derive(Clone)]
pub(crate) enum ScriptStep {
    Delta(&'static str),
    DeltaOwned(String),
    /// Pause before the next step (lets tests interleave cancellation).
    Wait(Duration),
    Error(&'static str),
}

/// Provider whose streams replay a fixed script and whose completions
/// return canned responses in order.
pub(crate) struct ScriptedProvider {
    script: Vec<ScriptStep>,
    completions: Mutex<Vec<Result<String, LlmError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn streaming(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            completions: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Add canned non-streaming responses to a streaming script.
    pub fn with_completions(self, responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            completions: Mutex::new(responses),
            ..self
        }
    }
}

impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut completions = self.completions.lock().unwrap();
        if completions.is_empty() {
            return Err(LlmError::Provider {
                message: "no scripted completion".to_string(),
            });
        }
        completions.remove(0).map(|content| CompletionResponse {
            id: "scripted".to_string(),
            content,
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.requests.lock().unwrap().push(request);
        let script = self.script.clone();
        Box::pin(async_stream::stream! {
            yield Ok(StreamEvent::Connected);
            for (i, step) in script.into_iter().enumerate() {
                match step {
                    ScriptStep::Delta(text) => yield Ok(StreamEvent::TextDelta {
                        index: i as u32,
                        text: text.to_string(),
                    }),
                    ScriptStep::DeltaOwned(text) => yield Ok(StreamEvent::TextDelta {
                        index: i as u32,
                        text,
                    }),
                    ScriptStep::Wait(duration) => tokio::time::sleep(duration).await,
                    ScriptStep::Error(message) => {
                        yield Err(LlmError::Stream(message.to_string()));
                        return;
                    }
                }
            }
            yield Ok(StreamEvent::Done);
        })
    }
}

/// Retriever returning a fixed outcome or error.
pub(crate) struct StaticRetriever {
    pub outcome: Result<RetrievalOutcome, &'static str>,
}

impl ContextRetriever for StaticRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _history: &[ChatMessage],
    ) -> Result<RetrievalOutcome, RetrievalError> {
        match &self.outcome {
            Ok(outcome) => Ok(outcome.clone()),
            Err(message) => Err(RetrievalError::Http(message.to_string())),
        }
    }
}

/// Speech synthesizer recording every spoken segment.
#[derive(Default)]
pub(crate) struct RecordingSpeech {
    pub spoken: Arc<Mutex<Vec<String>>>,
}

impl SpeechSynthesizer for RecordingSpeech {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Image generator returning a fixed markdown block.
pub(crate) struct StaticImageGenerator {
    pub result: &'static str,
}

impl crate::agents::ImageGenerator for StaticImageGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, suasion_types::error::AgentError> {
        Ok(self.result.to_string())
    }
}

/// Tangent agent echoing a fixed answer and recording prompts.
#[derive(Default)]
pub(crate) struct RecordingTangentAgent {
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub answer: &'static str,
}

impl crate::agents::TangentAgent for RecordingTangentAgent {
    async fn run(&self, prompt: &str) -> Result<String, suasion_types::error::AgentError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.to_string())
    }
}
