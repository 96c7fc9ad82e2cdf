//! Chat service wiring the turn orchestration pipeline.
//!
//! One entry point per user turn: route the mode/command, compose the
//! effective history, run the streaming turn, then schedule post-turn side
//! effects. The call resolves once the turn and any command side effects
//! are fully applied to the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use suasion_types::config::StudyConfig;
use suasion_types::conversation::{ChatMessage, ChatMode, MessagePatch, Phase};
use suasion_types::error::{StoreError, TurnError};
use suasion_types::llm::MessageRole;

use crate::agents::{BoxImageGenerator, BoxTangentAgent};
use crate::compose::PromptComposer;
use crate::effects::{SideEffectOptions, SideEffectScheduler};
use crate::event::EventBus;
use crate::llm::BoxChatProvider;
use crate::retrieval::BoxContextRetriever;
use crate::route::{commands, CommandRouter, Dispatch};
use crate::speech::BoxSpeechSynthesizer;
use crate::state::ConversationStateMachine;
use crate::store::ConversationStore;
use crate::turn::{InflightRegistry, TurnExecutor, TurnOptions, TurnOutcome, TurnRequest, TurnStatus};

/// Per-session settings for assistant turns and side effects.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub auto_speak_first_line: bool,
    pub follow_up_suggestions: bool,
    pub auto_title: bool,
}

impl ChatSettings {
    pub fn from_study(config: &StudyConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            auto_speak_first_line: config.auto_speak_first_line,
            follow_up_suggestions: config.follow_up_suggestions,
            auto_title: config.auto_title,
        }
    }
}

/// Orchestrates user turns against the shared conversation store.
pub struct ChatService<S: ConversationStore + 'static> {
    store: Arc<S>,
    executor: TurnExecutor<S>,
    scheduler: SideEffectScheduler<S>,
    state: ConversationStateMachine<S>,
    image: Option<Arc<BoxImageGenerator>>,
    tangent: Option<Arc<BoxTangentAgent>>,
    settings: ChatSettings,
    retrieval_enabled: bool,
    events: EventBus,
}

impl<S: ConversationStore + 'static> ChatService<S> {
    pub fn new(
        store: Arc<S>,
        provider: BoxChatProvider,
        settings: ChatSettings,
        events: EventBus,
    ) -> Self {
        let provider = Arc::new(provider);
        let inflight = Arc::new(InflightRegistry::new());
        let executor = TurnExecutor::new(
            Arc::clone(&store),
            Arc::clone(&provider),
            inflight,
            events.clone(),
        );
        let scheduler = SideEffectScheduler::new(
            Arc::clone(&store),
            provider,
            events.clone(),
            settings.model.clone(),
        );
        let state = ConversationStateMachine::new(Arc::clone(&store));

        Self {
            store,
            executor,
            scheduler,
            state,
            image: None,
            tangent: None,
            settings,
            retrieval_enabled: false,
            events,
        }
    }

    pub fn with_retriever(mut self, retriever: BoxContextRetriever) -> Self {
        self.executor = self.executor.with_retriever(Arc::new(retriever));
        self.retrieval_enabled = true;
        self
    }

    pub fn with_speech(mut self, speech: BoxSpeechSynthesizer) -> Self {
        self.executor = self.executor.with_speech(Arc::new(speech));
        self
    }

    pub fn with_image_generator(mut self, generator: BoxImageGenerator) -> Self {
        self.image = Some(Arc::new(generator));
        self
    }

    pub fn with_tangent_agent(mut self, agent: BoxTangentAgent) -> Self {
        self.tangent = Some(Arc::new(agent));
        self
    }

    /// The turn event bus, for live consumers.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The conversation state machine (phase, pairing, config binding).
    pub fn state(&self) -> &ConversationStateMachine<S> {
        &self.state
    }

    /// The shared conversation store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Abort the in-flight turn for a conversation, if any.
    pub fn abort_turn(&self, conversation_id: &Uuid) -> bool {
        self.executor.inflight().cancel(conversation_id)
    }

    /// Append a user message and execute the resulting turn.
    pub async fn send_user_message(
        &self,
        conversation_id: Uuid,
        mode: ChatMode,
        text: &str,
    ) -> Result<Option<TurnOutcome>, StoreError> {
        let conversation = self
            .store
            .get_conversation(&conversation_id)
            .await?
            .ok_or(StoreError::ConversationNotFound)?;

        let mut history = conversation.messages;
        history.push(ChatMessage::user(text));
        // Persist the user message immediately so it is visible before the
        // assistant turn starts.
        self.store.replace_messages(&conversation_id, &history).await?;

        self.execute(mode, conversation_id, history).await
    }

    /// Execute one user turn: route, then run the matching branch.
    ///
    /// Resolves once the turn and any command side effects are fully applied
    /// to the store. Unmatched combinations persist the history unchanged.
    pub async fn execute(
        &self,
        mode: ChatMode,
        conversation_id: Uuid,
        history: Vec<ChatMessage>,
    ) -> Result<Option<TurnOutcome>, StoreError> {
        match CommandRouter::route(mode, &history) {
            Dispatch::PersistOnly => {
                self.store.replace_messages(&conversation_id, &history).await?;
                Ok(None)
            }
            Dispatch::OverrideRole { role, text } => {
                let mut history = history;
                if let Some(last) = history.last_mut() {
                    last.role = role;
                    last.text = text;
                }
                self.store.replace_messages(&conversation_id, &history).await?;
                Ok(None)
            }
            Dispatch::GenerateImage { prompt } => {
                self.run_image(conversation_id, history, prompt).await
            }
            Dispatch::RunTangent { prompt } => {
                self.store.replace_messages(&conversation_id, &history).await?;
                self.run_tangent(conversation_id, prompt).await
            }
            Dispatch::StreamAssistant { follow_ups } => {
                self.run_assistant(conversation_id, history, follow_ups).await
            }
        }
    }

    /// The streaming path: compose, snapshot, execute, then side effects.
    async fn run_assistant(
        &self,
        conversation_id: Uuid,
        history: Vec<ChatMessage>,
        follow_ups: bool,
    ) -> Result<Option<TurnOutcome>, StoreError> {
        self.store.replace_messages(&conversation_id, &history).await?;
        let conversation = self
            .store
            .get_conversation(&conversation_id)
            .await?
            .ok_or(StoreError::ConversationNotFound)?;

        let today = Utc::now().date_naive();
        let composed = PromptComposer::rebuild_history(
            conversation.phase,
            &conversation.config,
            &history,
            today,
        );

        // Audit snapshot: persisted once, the first time a directive-bearing
        // prompt is composed, fully resolved.
        if conversation.initial_system_message.is_none() && conversation.config.has_directives() {
            self.store
                .set_initial_system_message(&conversation_id, &composed[0].text)
                .await?;
        }

        let request = TurnRequest {
            conversation_id,
            history: composed,
            llm_id: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
        };
        let options = TurnOptions {
            augment: self.retrieval_enabled
                && conversation.phase == Phase::Dialogue
                && conversation.config.topic.is_some(),
            speak_first_line: self.settings.auto_speak_first_line,
        };

        let outcome = match self.executor.execute_turn(request, &options).await {
            Ok(outcome) => outcome,
            Err(TurnError::Store(e)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "turn settled abnormally");
                return Ok(None);
            }
        };

        // A cancelled turn schedules nothing; its placeholder was abandoned.
        if outcome.status != TurnStatus::Cancelled {
            self.scheduler
                .run_post_turn(
                    conversation_id,
                    outcome.message_id,
                    SideEffectOptions {
                        follow_up_suggestions: follow_ups && self.settings.follow_up_suggestions,
                        auto_title: self.settings.auto_title,
                    },
                )
                .await;
        }

        Ok(Some(outcome))
    }

    /// The image path: rewrite the persisted message to command form, then
    /// run the generator through a typing placeholder.
    async fn run_image(
        &self,
        conversation_id: Uuid,
        mut history: Vec<ChatMessage>,
        prompt: String,
    ) -> Result<Option<TurnOutcome>, StoreError> {
        if let Some(last) = history.last_mut().filter(|m| m.role == MessageRole::User) {
            if !last.text.starts_with('/') {
                last.text = format!("{} {prompt}", commands::CMD_IMAGE[0]);
            }
        }
        self.store.replace_messages(&conversation_id, &history).await?;

        let Some(generator) = &self.image else {
            warn!("image generation requested but no generator is configured");
            return Ok(None);
        };

        self.run_aux_turn(conversation_id, "image-generation", async {
            generator.generate(&prompt).await.map_err(|e| e.to_string())
        })
        .await
    }

    /// The tangent path: answer a one-off question outside the dialogue.
    async fn run_tangent(
        &self,
        conversation_id: Uuid,
        prompt: String,
    ) -> Result<Option<TurnOutcome>, StoreError> {
        let Some(agent) = &self.tangent else {
            warn!("tangent agent requested but not configured");
            return Ok(None);
        };

        self.run_aux_turn(conversation_id, "tangent-agent", async {
            agent.run(&prompt).await.map_err(|e| e.to_string())
        })
        .await
    }

    /// Shared placeholder-then-patch shape for auxiliary (non-streaming)
    /// assistant turns.
    async fn run_aux_turn(
        &self,
        conversation_id: Uuid,
        origin: &str,
        task: impl std::future::Future<Output = Result<String, String>>,
    ) -> Result<Option<TurnOutcome>, StoreError> {
        let mut placeholder = ChatMessage::assistant("");
        placeholder.typing = true;
        placeholder.origin_llm = Some(origin.to_string());
        let message_id = placeholder.id;
        self.store.append_message(&conversation_id, &placeholder).await?;

        let (text, status) = match task.await {
            Ok(text) => (text, TurnStatus::Completed),
            Err(error) => {
                warn!(origin, error = %error, "auxiliary turn failed");
                (format!("{origin} failed: {error}"), TurnStatus::Failed(error))
            }
        };

        let patch = MessagePatch {
            text: Some(text.clone()),
            typing: Some(false),
            ..MessagePatch::default()
        };
        self.store.patch_message(&conversation_id, &message_id, &patch).await?;

        Ok(Some(TurnOutcome {
            message_id,
            status,
            text,
        }))
    }
}
