//! Post-turn side-effect scheduling.
//!
//! Runs only after a turn completes without cancellation, and only when
//! enabled by the caller. Each task is spawned with its own error sink:
//! a failure is logged, never alters the finalized message, and never
//! blocks the other task. Neither task triggers another full turn.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use suasion_types::conversation::{ChatMessage, MessagePatch};
use suasion_types::event::TurnEvent;
use suasion_types::llm::MessageRole;

use crate::event::EventBus;
use crate::llm::BoxChatProvider;
use crate::store::ConversationStore;

use super::suggestions::generate_suggestions;
use super::title::generate_title;

/// Which side effects to run for a finished turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideEffectOptions {
    pub follow_up_suggestions: bool,
    pub auto_title: bool,
}

/// Schedules isolated post-turn tasks against the shared store.
pub struct SideEffectScheduler<S> {
    store: Arc<S>,
    provider: Arc<BoxChatProvider>,
    events: EventBus,
    model: String,
}

impl<S: ConversationStore + 'static> SideEffectScheduler<S> {
    pub fn new(
        store: Arc<S>,
        provider: Arc<BoxChatProvider>,
        events: EventBus,
        model: String,
    ) -> Self {
        Self {
            store,
            provider,
            events,
            model,
        }
    }

    /// Run the enabled side effects for a completed turn and wait for them
    /// to settle. Task failures are absorbed here.
    pub async fn run_post_turn(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        options: SideEffectOptions,
    ) {
        let mut handles = Vec::with_capacity(2);

        if options.follow_up_suggestions {
            let store = Arc::clone(&self.store);
            let provider = Arc::clone(&self.provider);
            let events = self.events.clone();
            let model = self.model.clone();
            handles.push(tokio::spawn(async move {
                suggestions_task(store, provider, events, model, conversation_id, message_id)
                    .await;
            }));
        }

        if options.auto_title {
            let store = Arc::clone(&self.store);
            let provider = Arc::clone(&self.provider);
            let events = self.events.clone();
            let model = self.model.clone();
            handles.push(tokio::spawn(async move {
                title_task(store, provider, events, model, conversation_id).await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "side-effect task panicked");
            }
        }
    }
}

/// Generate follow-up suggestions and patch them onto the message.
async fn suggestions_task<S: ConversationStore>(
    store: Arc<S>,
    provider: Arc<BoxChatProvider>,
    events: EventBus,
    model: String,
    conversation_id: Uuid,
    message_id: Uuid,
) {
    let message = match load_message(&store, &conversation_id, &message_id).await {
        Some(message) if !message.text.is_empty() => message,
        _ => return,
    };

    match generate_suggestions(&provider, &message.text, &model).await {
        Ok(suggestions) if !suggestions.is_empty() => {
            let count = suggestions.len();
            let patch = MessagePatch {
                suggestions: Some(suggestions),
                ..MessagePatch::default()
            };
            if let Err(e) = store.patch_message(&conversation_id, &message_id, &patch).await {
                warn!(error = %e, "failed to store follow-up suggestions");
                return;
            }
            events.publish(TurnEvent::SuggestionsReady {
                conversation_id,
                message_id,
                count,
            });
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "follow-up suggestion generation failed");
        }
    }
}

/// Derive a title from the first exchange, iff the conversation has none.
async fn title_task<S: ConversationStore>(
    store: Arc<S>,
    provider: Arc<BoxChatProvider>,
    events: EventBus,
    model: String,
    conversation_id: Uuid,
) {
    let conversation = match store.get_conversation(&conversation_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "failed to load conversation for auto-title");
            return;
        }
    };
    if conversation.auto_title.is_some() {
        return;
    }

    let first_user = conversation
        .messages
        .iter()
        .find(|m| m.role == MessageRole::User && !m.text.is_empty());
    let first_assistant = conversation
        .messages
        .iter()
        .find(|m| m.role == MessageRole::Assistant && !m.text.is_empty() && !m.typing);
    let (Some(user), Some(assistant)) = (first_user, first_assistant) else {
        return;
    };

    match generate_title(&provider, &user.text, &assistant.text, &model).await {
        Ok(title) if !title.is_empty() => {
            if let Err(e) = store.set_auto_title(&conversation_id, &title).await {
                warn!(error = %e, "failed to store auto-title");
                return;
            }
            info!(title = %title, "conversation title generated");
            events.publish(TurnEvent::TitleSet {
                conversation_id,
                title,
            });
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "auto-title generation failed");
        }
    }
}

async fn load_message<S: ConversationStore>(
    store: &Arc<S>,
    conversation_id: &Uuid,
    message_id: &Uuid,
) -> Option<ChatMessage> {
    match store.get_conversation(conversation_id).await {
        Ok(Some(conversation)) => conversation
            .messages
            .into_iter()
            .find(|m| m.id == *message_id),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "failed to load message for side effect");
            None
        }
    }
}
