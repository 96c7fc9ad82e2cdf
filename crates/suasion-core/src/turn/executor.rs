//! Streaming turn execution.
//!
//! `execute_turn` settles when the stream terminates and acts purely
//! through side effects on the shared store: an immediately-visible typing
//! placeholder, id-keyed text patches while chunks arrive, and a final
//! `typing = false` regardless of how the stream ended. Cancellation is
//! cooperative: the token is re-checked before every patch application, and
//! a cancelled turn keeps whatever content had already been merged.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use suasion_types::conversation::{ChatMessage, MessagePatch};
use suasion_types::error::TurnError;
use suasion_types::event::TurnEvent;
use suasion_types::llm::{CompletionRequest, Message, MessageRole, StreamEvent};

use crate::event::EventBus;
use crate::llm::BoxChatProvider;
use crate::retrieval::BoxContextRetriever;
use crate::speech::BoxSpeechSynthesizer;
use crate::store::ConversationStore;

use super::inflight::{InflightRegistry, TurnGuard};
use super::speak::FirstLineScanner;

/// One turn's inputs. Ephemeral: constructed per send, discarded after the
/// turn settles.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: Uuid,
    /// Effective history snapshot, composed system message at index 0.
    pub history: Vec<ChatMessage>,
    pub llm_id: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

/// Per-turn switches supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// Attempt retrieval augmentation before streaming.
    pub augment: bool,
    /// Speak the opening line once a cut point is found.
    pub speak_first_line: bool,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    Completed,
    Cancelled,
    Failed(String),
}

/// Settlement record of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub message_id: Uuid,
    pub status: TurnStatus,
    /// Accumulated assistant text at settlement (possibly partial).
    pub text: String,
}

/// Runs one assistant turn against the shared store.
pub struct TurnExecutor<S: ConversationStore> {
    store: Arc<S>,
    provider: Arc<BoxChatProvider>,
    retriever: Option<Arc<BoxContextRetriever>>,
    speech: Option<Arc<BoxSpeechSynthesizer>>,
    inflight: Arc<InflightRegistry>,
    events: EventBus,
}

impl<S: ConversationStore + 'static> TurnExecutor<S> {
    pub fn new(
        store: Arc<S>,
        provider: Arc<BoxChatProvider>,
        inflight: Arc<InflightRegistry>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            provider,
            retriever: None,
            speech: None,
            inflight,
            events,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<BoxContextRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_speech(mut self, speech: Arc<BoxSpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// The in-flight registry, for external aborts.
    pub fn inflight(&self) -> &InflightRegistry {
        &self.inflight
    }

    /// Run one assistant turn. Settles when the stream terminates.
    ///
    /// Only a failure to create the placeholder is returned as an error;
    /// transport failures and cancellation settle into the outcome with
    /// partial content retained and `typing` cleared.
    #[tracing::instrument(
        name = "execute_turn",
        skip(self, request, options),
        fields(conversation_id = %request.conversation_id, model = %request.llm_id)
    )]
    pub async fn execute_turn(
        &self,
        request: TurnRequest,
        options: &TurnOptions,
    ) -> Result<TurnOutcome, TurnError> {
        let TurnRequest {
            conversation_id,
            mut history,
            llm_id,
            max_tokens,
            temperature,
        } = request;

        // Claim the conversation's single in-flight slot up front, cancelling
        // any previous turn, so the superseded placeholder stops typing
        // before the new one appears.
        let guard = self.inflight.begin(conversation_id);

        // Placeholder goes into the store before any network call.
        let mut placeholder = ChatMessage::assistant("");
        placeholder.typing = true;
        placeholder.origin_llm = Some(llm_id.clone());
        placeholder.purpose_id = history
            .first()
            .filter(|m| m.role == MessageRole::System)
            .and_then(|m| m.purpose_id.clone());
        let message_id = placeholder.id;

        if let Err(e) = self.store.append_message(&conversation_id, &placeholder).await {
            self.inflight.finish(&guard);
            return Err(TurnError::Store(e));
        }
        self.events.publish(TurnEvent::TurnStarted {
            conversation_id,
            message_id,
        });

        // Best-effort augmentation; never blocks or fails the turn.
        if options.augment {
            self.augment(&conversation_id, &message_id, &mut history).await;
        }

        let completion = build_completion_request(&llm_id, &history, max_tokens, temperature);

        let status = self
            .stream_into_store(&conversation_id, &message_id, completion, &guard, options)
            .await;

        // Clear typing no matter how the stream ended.
        if let Err(e) = self
            .store
            .patch_message(&conversation_id, &message_id, &MessagePatch::typing(false))
            .await
        {
            warn!(error = %e, "failed to clear typing flag");
        }
        self.inflight.finish(&guard);

        let text = self
            .store
            .get_conversation(&conversation_id)
            .await
            .ok()
            .flatten()
            .and_then(|c| c.messages.into_iter().find(|m| m.id == message_id))
            .map(|m| m.text)
            .unwrap_or_default();

        match &status {
            TurnStatus::Completed => self.events.publish(TurnEvent::TurnCompleted {
                conversation_id,
                message_id,
            }),
            TurnStatus::Cancelled => self.events.publish(TurnEvent::TurnCancelled {
                conversation_id,
                message_id,
            }),
            TurnStatus::Failed(error) => self.events.publish(TurnEvent::TurnFailed {
                conversation_id,
                message_id,
                error: error.clone(),
            }),
        }

        Ok(TurnOutcome {
            message_id,
            status,
            text,
        })
    }

    /// Substitute the composed history with an augmented version and mark
    /// the placeholder with the retrieved snippets. Silent fallback on any
    /// failure.
    async fn augment(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        history: &mut [ChatMessage],
    ) {
        let Some(retriever) = &self.retriever else {
            return;
        };
        let Some(query) = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.text.clone())
        else {
            return;
        };

        match retriever.retrieve(&query, history).await {
            Ok(outcome) if outcome.should_enhance => {
                if let Some(enhanced) = outcome.enhanced_system_text {
                    if let Some(system) = history
                        .first_mut()
                        .filter(|m| m.role == MessageRole::System)
                    {
                        system.text = enhanced;
                    }
                }
                if !outcome.snippets.is_empty() {
                    let patch = MessagePatch {
                        retrieved_context: Some(outcome.snippets),
                        ..MessagePatch::default()
                    };
                    if let Err(e) = self
                        .store
                        .patch_message(conversation_id, message_id, &patch)
                        .await
                    {
                        warn!(error = %e, "failed to record retrieved context");
                    }
                }
            }
            Ok(_) => {
                debug!("retriever declined to enhance this turn");
            }
            Err(e) => {
                debug!(error = %e, "retrieval augmentation failed, using composed prompt");
            }
        }
    }

    /// Consume the stream, patching accumulated text into the store. Absorbs
    /// transport failures; distinguishes only completion vs cancellation vs
    /// failure.
    async fn stream_into_store(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        completion: CompletionRequest,
        guard: &TurnGuard,
        options: &TurnOptions,
    ) -> TurnStatus {
        let mut stream = self.provider.stream(completion);
        let mut full_text = String::new();
        let mut scanner = FirstLineScanner::new();

        loop {
            let next = tokio::select! {
                _ = guard.token.cancelled() => {
                    debug!("turn cancelled while awaiting stream");
                    return TurnStatus::Cancelled;
                }
                next = stream.next() => next,
            };

            let Some(event) = next else {
                return TurnStatus::Completed;
            };

            match event {
                Ok(StreamEvent::TextDelta { text, .. }) => {
                    // Re-check before each application; chunks already
                    // buffered must not reach the store once cancelled.
                    if guard.token.is_cancelled() {
                        return TurnStatus::Cancelled;
                    }
                    full_text.push_str(&text);

                    if let Err(e) = self
                        .store
                        .patch_message(conversation_id, message_id, &MessagePatch::text(full_text.clone()))
                        .await
                    {
                        warn!(error = %e, "failed to patch streamed text");
                        return TurnStatus::Failed(e.to_string());
                    }
                    self.events.publish(TurnEvent::TextDelta {
                        conversation_id: *conversation_id,
                        message_id: *message_id,
                        text,
                    });

                    if options.speak_first_line {
                        self.maybe_speak(conversation_id, message_id, &mut scanner, &full_text);
                    }
                }
                Ok(StreamEvent::Done) => return TurnStatus::Completed,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "stream transport failure, keeping partial content");
                    return TurnStatus::Failed(e.to_string());
                }
            }
        }
    }

    /// Fire the one-shot first-line speech call when a cut point appears.
    fn maybe_speak(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        scanner: &mut FirstLineScanner,
        full_text: &str,
    ) {
        let Some(speech) = &self.speech else {
            return;
        };
        if scanner.fired() {
            return;
        }
        if let Some(segment) = scanner.scan(full_text) {
            let segment = segment.to_string();
            let chars = segment.len();
            let speech = Arc::clone(speech);
            tokio::spawn(async move {
                if let Err(e) = speech.speak(&segment).await {
                    warn!(error = %e, "first-line speech synthesis failed");
                }
            });
            self.events.publish(TurnEvent::SpeechDispatched {
                conversation_id: *conversation_id,
                message_id: *message_id,
                chars,
            });
        }
    }
}

/// Map the effective history onto a wire-format completion request.
fn build_completion_request(
    llm_id: &str,
    history: &[ChatMessage],
    max_tokens: u32,
    temperature: Option<f64>,
) -> CompletionRequest {
    let system = history
        .first()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.text.clone());

    let messages = history
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| Message {
            role: m.role,
            content: m.text.clone(),
        })
        .collect();

    CompletionRequest {
        model: llm_id.to_string(),
        messages,
        system,
        max_tokens,
        temperature,
        stream: true,
        stop_sequences: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use suasion_types::conversation::{Conversation, Phase};
    use suasion_types::retrieval::{RetrievalOutcome, RetrievedSnippet};

    use crate::testing::{MemStore, RecordingSpeech, ScriptStep, ScriptedProvider, StaticRetriever};

    fn executor_with(
        store: Arc<MemStore>,
        provider: ScriptedProvider,
    ) -> TurnExecutor<MemStore> {
        TurnExecutor::new(
            store,
            Arc::new(BoxChatProvider::new(provider)),
            Arc::new(InflightRegistry::new()),
            EventBus::new(64),
        )
    }

    fn seeded_request(conversation_id: Uuid) -> TurnRequest {
        let mut system = ChatMessage::system("You are helpful.");
        system.purpose_id = Some("persuasive-dialogue".to_string());
        TurnRequest {
            conversation_id,
            history: vec![system, ChatMessage::user("hello")],
            llm_id: "gpt-4o".to_string(),
            max_tokens: 1024,
            temperature: Some(0.7),
        }
    }

    #[tokio::test]
    async fn turn_streams_text_into_placeholder() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let provider = ScriptedProvider::streaming(vec![
            ScriptStep::Delta("Hello"),
            ScriptStep::Delta(", world"),
        ]);
        let executor = executor_with(Arc::clone(&store), provider);

        let outcome = executor
            .execute_turn(seeded_request(id), &TurnOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.text, "Hello, world");

        let message = store.message(&id, &outcome.message_id).unwrap();
        assert_eq!(message.text, "Hello, world");
        assert!(!message.typing, "typing must clear on stream close");
        assert_eq!(message.origin_llm.as_deref(), Some("gpt-4o"));
        assert_eq!(message.purpose_id.as_deref(), Some("persuasive-dialogue"));
    }

    #[tokio::test]
    async fn transport_failure_keeps_partial_content() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let provider = ScriptedProvider::streaming(vec![
            ScriptStep::Delta("partial "),
            ScriptStep::Error("connection reset"),
        ]);
        let executor = executor_with(Arc::clone(&store), provider);

        let outcome = executor
            .execute_turn(seeded_request(id), &TurnOptions::default())
            .await
            .unwrap();

        assert!(matches!(outcome.status, TurnStatus::Failed(_)));
        let message = store.message(&id, &outcome.message_id).unwrap();
        assert_eq!(message.text, "partial ");
        assert!(!message.typing);
    }

    #[tokio::test]
    async fn superseding_turn_cancels_previous_stream() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let slow_provider = ScriptedProvider::streaming(vec![
            ScriptStep::Delta("first turn "),
            ScriptStep::Wait(Duration::from_millis(200)),
            ScriptStep::Delta("never lands"),
        ]);
        let fast_provider = ScriptedProvider::streaming(vec![ScriptStep::Delta("second turn")]);

        let inflight = Arc::new(InflightRegistry::new());
        let events = EventBus::new(64);
        let executor_a = TurnExecutor::new(
            Arc::clone(&store),
            Arc::new(BoxChatProvider::new(slow_provider)),
            Arc::clone(&inflight),
            events.clone(),
        );
        let executor_b = TurnExecutor::new(
            Arc::clone(&store),
            Arc::new(BoxChatProvider::new(fast_provider)),
            inflight,
            events,
        );

        let request_a = seeded_request(id);
        let request_b = seeded_request(id);
        let handle_a =
            tokio::spawn(async move { executor_a.execute_turn(request_a, &TurnOptions::default()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome_b = executor_b
            .execute_turn(request_b, &TurnOptions::default())
            .await
            .unwrap();
        let outcome_a = handle_a.await.unwrap().unwrap();

        assert_eq!(outcome_a.status, TurnStatus::Cancelled);
        assert_eq!(outcome_b.status, TurnStatus::Completed);
        assert_ne!(outcome_a.message_id, outcome_b.message_id);

        // A's partial content survives, no rollback; both placeholders done typing.
        let message_a = store.message(&id, &outcome_a.message_id).unwrap();
        assert_eq!(message_a.text, "first turn ");
        assert!(!message_a.typing);
        let message_b = store.message(&id, &outcome_b.message_id).unwrap();
        assert_eq!(message_b.text, "second turn");
    }

    #[tokio::test]
    async fn at_most_one_typing_message_after_supersede() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let provider = ScriptedProvider::streaming(vec![
            ScriptStep::Delta("x"),
            ScriptStep::Wait(Duration::from_millis(100)),
            ScriptStep::Delta("y"),
        ]);
        let executor = Arc::new(executor_with(Arc::clone(&store), provider));

        let first = Arc::clone(&executor);
        let request = seeded_request(id);
        let handle = tokio::spawn(async move {
            first.execute_turn(request, &TurnOptions::default()).await
        });
        tokio::time::sleep(Duration::from_millis(30)).await;

        let outcome = executor
            .execute_turn(seeded_request(id), &TurnOptions::default())
            .await
            .unwrap();
        let _ = handle.await.unwrap().unwrap();

        let typing_count = store
            .conversation(&id)
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.typing)
            .count();
        assert_eq!(typing_count, 0);
        assert_eq!(outcome.status, TurnStatus::Completed);
    }

    #[tokio::test]
    async fn augmentation_substitutes_system_text_and_marks_context() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let provider = ScriptedProvider::streaming(vec![ScriptStep::Delta("grounded answer")]);
        let snippets = vec![RetrievedSnippet {
            content: "phones distract students".to_string(),
            score: 0.92,
            source: Some("study-42".to_string()),
        }];
        let retriever = StaticRetriever {
            outcome: Ok(RetrievalOutcome {
                should_enhance: true,
                enhanced_system_text: Some("ENHANCED PROMPT".to_string()),
                snippets,
            }),
        };
        let executor = executor_with(Arc::clone(&store), provider)
            .with_retriever(Arc::new(BoxContextRetriever::new(retriever)));

        let outcome = executor
            .execute_turn(
                seeded_request(id),
                &TurnOptions {
                    augment: true,
                    speak_first_line: false,
                },
            )
            .await
            .unwrap();

        let message = store.message(&id, &outcome.message_id).unwrap();
        let context = message.retrieved_context.unwrap();
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].source.as_deref(), Some("study-42"));
    }

    #[tokio::test]
    async fn augmentation_failure_falls_back_silently() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let provider = ScriptedProvider::streaming(vec![ScriptStep::Delta("plain answer")]);
        let retriever = StaticRetriever {
            outcome: Err("index unavailable"),
        };
        let executor = executor_with(Arc::clone(&store), provider)
            .with_retriever(Arc::new(BoxContextRetriever::new(retriever)));

        let outcome = executor
            .execute_turn(
                seeded_request(id),
                &TurnOptions {
                    augment: true,
                    speak_first_line: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, TurnStatus::Completed);
        let message = store.message(&id, &outcome.message_id).unwrap();
        assert_eq!(message.text, "plain answer");
        assert!(message.retrieved_context.is_none());
    }

    #[tokio::test]
    async fn first_line_speech_fires_at_most_once() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let opener = "s".repeat(150);
        let provider = ScriptedProvider::streaming(vec![
            ScriptStep::DeltaOwned(format!("{opener}\n")),
            ScriptStep::Delta("second paragraph\n"),
            ScriptStep::Delta("third paragraph\n"),
        ]);
        let speech = RecordingSpeech::default();
        let spoken = Arc::clone(&speech.spoken);
        let executor = executor_with(Arc::clone(&store), provider)
            .with_speech(Arc::new(BoxSpeechSynthesizer::new(speech)));

        let outcome = executor
            .execute_turn(
                seeded_request(id),
                &TurnOptions {
                    augment: false,
                    speak_first_line: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, TurnStatus::Completed);

        // Let the fire-and-forget task run.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let spoken = spoken.lock().unwrap();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0], opener);
    }

    #[tokio::test]
    async fn no_speech_without_cut_point_in_range() {
        let (store, id) = MemStore::with_conversation(Conversation::new(Phase::Dialogue));
        let provider = ScriptedProvider::streaming(vec![ScriptStep::Delta("short.\nanswer")]);
        let speech = RecordingSpeech::default();
        let spoken = Arc::clone(&speech.spoken);
        let executor = executor_with(Arc::clone(&store), provider)
            .with_speech(Arc::new(BoxSpeechSynthesizer::new(speech)));

        executor
            .execute_turn(
                seeded_request(id),
                &TurnOptions {
                    augment: false,
                    speak_first_line: true,
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_conversation_is_a_store_error() {
        let store = Arc::new(MemStore::new());
        let provider = ScriptedProvider::streaming(vec![ScriptStep::Delta("unused")]);
        let executor = executor_with(store, provider);

        let result = executor
            .execute_turn(seeded_request(Uuid::now_v7()), &TurnOptions::default())
            .await;
        assert!(matches!(result, Err(TurnError::Store(_))));
    }
}
