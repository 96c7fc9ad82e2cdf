//! Conversation state transitions.
//!
//! Governs the per-conversation phase, the one-shot persuasion-config
//! binding, and the 1:1 dialogue/memo pairing that drives the split
//! display. Pairing, once established, is authoritative.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use suasion_types::conversation::{
    ChatMessage, Conversation, PersuasionConfig, Phase, Standpoint, Strategy,
};
use suasion_types::error::{StateError, StoreError};

use crate::compose::templates;
use crate::store::ConversationStore;

/// Derived display state for the active conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Single,
    Split,
}

/// Phase/pairing/binding authority over the conversation store.
pub struct ConversationStateMachine<S> {
    store: Arc<S>,
}

impl<S: ConversationStore> ConversationStateMachine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an empty dialogue conversation.
    pub async fn create_dialogue(&self) -> Result<Conversation, StateError> {
        let conversation = Conversation::new(Phase::Dialogue);
        self.store
            .create_conversation(&conversation)
            .await
            .map_err(map_store_error)?;
        Ok(conversation)
    }

    /// Bind topic, standpoint, and strategy for a conversation, once.
    ///
    /// Raw standpoint/strategy values are resolved here, at the binding
    /// boundary; unknown values bind as `Unset`. Binding must happen before
    /// the first user message and is rejected once any field is set. When a
    /// topic is bound to an empty conversation, the topic-aware opening
    /// greeting is seeded as the first assistant message.
    pub async fn bind_config(
        &self,
        conversation_id: &Uuid,
        topic: Option<String>,
        standpoint: &str,
        strategy: &str,
    ) -> Result<PersuasionConfig, StateError> {
        let conversation = self.load(conversation_id).await?;
        if conversation.config.is_bound() || conversation.has_user_messages() {
            return Err(StateError::ConfigBound);
        }

        let config = PersuasionConfig {
            topic,
            standpoint: Standpoint::resolve(standpoint),
            strategy: Strategy::resolve(strategy),
        };
        self.store
            .bind_config(conversation_id, &config)
            .await
            .map_err(map_store_error)?;
        info!(
            conversation_id = %conversation_id,
            standpoint = %config.standpoint,
            strategy = %config.strategy,
            "persuasion config bound"
        );

        if conversation.messages.is_empty() {
            if let Some(ref topic) = config.topic {
                let greeting = ChatMessage::assistant(templates::dialogue_greeting(topic));
                self.store
                    .append_message(conversation_id, &greeting)
                    .await
                    .map_err(map_store_error)?;
            }
        }

        Ok(config)
    }

    /// Spawn the memo conversation paired with a dialogue.
    ///
    /// The memo inherits the dialogue's topic (but no standpoint or
    /// strategy), opens with the memo greeting, and is paired both ways.
    pub async fn spawn_memo(&self, dialogue_id: &Uuid) -> Result<Conversation, StateError> {
        let dialogue = self.load(dialogue_id).await?;
        if dialogue.phase != Phase::Dialogue {
            return Err(StateError::PhaseMismatch {
                required: Phase::Dialogue.to_string(),
                actual: dialogue.phase.to_string(),
            });
        }
        if dialogue.paired_memo_id.is_some() {
            return Err(StateError::AlreadyPaired);
        }

        let mut memo = Conversation::new(Phase::Memo);
        memo.config.topic = dialogue.config.topic.clone();
        memo.messages.push(ChatMessage::assistant(templates::memo_greeting(
            memo.config.topic.as_deref(),
        )));

        self.store
            .create_conversation(&memo)
            .await
            .map_err(map_store_error)?;
        self.store
            .pair_memo(dialogue_id, &memo.id)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => StateError::AlreadyPaired,
                other => map_store_error(other),
            })?;
        info!(dialogue_id = %dialogue_id, memo_id = %memo.id, "memo conversation spawned");

        self.load(&memo.id).await
    }

    /// Derived display state: `Split` iff a pairing exists.
    pub async fn layout(&self, conversation_id: &Uuid) -> Result<Layout, StateError> {
        let conversation = self.load(conversation_id).await?;
        Ok(if conversation.paired_id().is_some() {
            Layout::Split
        } else {
            Layout::Single
        })
    }

    async fn load(&self, conversation_id: &Uuid) -> Result<Conversation, StateError> {
        self.store
            .get_conversation(conversation_id)
            .await
            .map_err(map_store_error)?
            .ok_or(StateError::NotFound)
    }
}

fn map_store_error(error: StoreError) -> StateError {
    match error {
        StoreError::ConversationNotFound | StoreError::MessageNotFound => StateError::NotFound,
        StoreError::ConfigBound => StateError::ConfigBound,
        StoreError::Conflict(_) => StateError::AlreadyPaired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemStore;

    fn machine() -> (ConversationStateMachine<MemStore>, Arc<MemStore>) {
        let store = Arc::new(MemStore::new());
        (ConversationStateMachine::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn bind_config_resolves_and_seeds_greeting() {
        let (machine, store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();

        let config = machine
            .bind_config(
                &dialogue.id,
                Some("Cell phones in schools".to_string()),
                "opposing",
                "clarification",
            )
            .await
            .unwrap();

        assert_eq!(config.standpoint, Standpoint::Opposing);
        assert_eq!(config.strategy, Strategy::Clarification);

        let stored = store.conversation(&dialogue.id).unwrap();
        assert_eq!(stored.config, config);
        assert_eq!(stored.messages.len(), 1);
        assert!(stored.messages[0].text.contains("Cell phones in schools"));
    }

    #[tokio::test]
    async fn unknown_values_bind_as_unset() {
        let (machine, _store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();

        let config = machine
            .bind_config(&dialogue.id, Some("Topic".to_string()), "neutral", "socratic")
            .await
            .unwrap();

        assert_eq!(config.standpoint, Standpoint::Unset);
        assert_eq!(config.strategy, Strategy::Unset);
    }

    #[tokio::test]
    async fn rebinding_is_rejected() {
        let (machine, _store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();

        machine
            .bind_config(&dialogue.id, Some("Topic".to_string()), "supporting", "suggestion")
            .await
            .unwrap();

        let result = machine
            .bind_config(&dialogue.id, Some("Other".to_string()), "opposing", "clarification")
            .await;
        assert!(matches!(result, Err(StateError::ConfigBound)));
    }

    #[tokio::test]
    async fn binding_after_first_user_message_is_rejected() {
        let (machine, store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();
        store
            .append_message(&dialogue.id, &ChatMessage::user("too late"))
            .await
            .unwrap();

        let result = machine
            .bind_config(&dialogue.id, Some("Topic".to_string()), "supporting", "suggestion")
            .await;
        assert!(matches!(result, Err(StateError::ConfigBound)));
    }

    #[tokio::test]
    async fn spawn_memo_pairs_both_directions() {
        let (machine, store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();
        machine
            .bind_config(&dialogue.id, Some("Topic".to_string()), "supporting", "suggestion")
            .await
            .unwrap();

        let memo = machine.spawn_memo(&dialogue.id).await.unwrap();

        assert_eq!(memo.phase, Phase::Memo);
        assert_eq!(memo.paired_dialogue_id, Some(dialogue.id));
        assert_eq!(memo.config.topic.as_deref(), Some("Topic"));
        assert_eq!(memo.config.standpoint, Standpoint::Unset);
        assert!(memo.messages[0].text.contains("opinion memo"));

        let stored_dialogue = store.conversation(&dialogue.id).unwrap();
        assert_eq!(stored_dialogue.paired_memo_id, Some(memo.id));
    }

    #[tokio::test]
    async fn spawn_memo_twice_is_rejected() {
        let (machine, _store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();
        machine.spawn_memo(&dialogue.id).await.unwrap();

        let result = machine.spawn_memo(&dialogue.id).await;
        assert!(matches!(result, Err(StateError::AlreadyPaired)));
    }

    #[tokio::test]
    async fn spawn_memo_from_memo_is_a_phase_mismatch() {
        let (machine, _store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();
        let memo = machine.spawn_memo(&dialogue.id).await.unwrap();

        let result = machine.spawn_memo(&memo.id).await;
        assert!(matches!(result, Err(StateError::PhaseMismatch { .. })));
    }

    #[tokio::test]
    async fn layout_derives_from_pairing() {
        let (machine, _store) = machine();
        let dialogue = machine.create_dialogue().await.unwrap();
        assert_eq!(machine.layout(&dialogue.id).await.unwrap(), Layout::Single);

        let memo = machine.spawn_memo(&dialogue.id).await.unwrap();
        assert_eq!(machine.layout(&dialogue.id).await.unwrap(), Layout::Split);
        assert_eq!(machine.layout(&memo.id).await.unwrap(), Layout::Split);
    }

    #[tokio::test]
    async fn missing_conversation_is_not_found() {
        let (machine, _store) = machine();
        let result = machine.layout(&Uuid::now_v7()).await;
        assert!(matches!(result, Err(StateError::NotFound)));
    }
}
