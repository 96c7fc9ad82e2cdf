//! DashMap-backed implementation of `ConversationStore`.
//!
//! Process-local store with the synchronous read-after-write guarantee the
//! single-in-flight-per-conversation invariant depends on. Each operation
//! locks a single conversation shard; writers apply per-message-id patches
//! so interleaved callbacks never lose updates.

use dashmap::DashMap;
use uuid::Uuid;

use suasion_core::store::ConversationStore;
use suasion_types::conversation::{ChatMessage, Conversation, MessagePatch, PersuasionConfig};
use suasion_types::error::StoreError;

/// In-memory conversation store.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: DashMap<Uuid, Conversation>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_conversation<R>(
        &self,
        conversation_id: &Uuid,
        f: impl FnOnce(&mut Conversation) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut entry = self
            .conversations
            .get_mut(conversation_id)
            .ok_or(StoreError::ConversationNotFound)?;
        f(entry.value_mut())
    }
}

impl ConversationStore for InMemoryConversationStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        if self.conversations.contains_key(&conversation.id) {
            return Err(StoreError::Conflict(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }
        self.conversations
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversations
            .get(conversation_id)
            .map(|entry| entry.value().clone()))
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let mut all: Vec<Conversation> = self
            .conversations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|c| c.created_at);
        Ok(all)
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        self.with_conversation(conversation_id, |conversation| {
            conversation.messages.push(message.clone());
            Ok(())
        })
    }

    async fn patch_message(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        patch: &MessagePatch,
    ) -> Result<(), StoreError> {
        self.with_conversation(conversation_id, |conversation| {
            let message = conversation
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
        self.with_conversation(conversation_id, |conversation| {
            conversation.messages = messages.to_vec();
            Ok(())
        })
    }

    async fn bind_config(
        &self,
        conversation_id: &Uuid,
        config: &PersuasionConfig,
    ) -> Result<(), StoreError> {
        self.with_conversation(conversation_id, |conversation| {
            if conversation.config.is_bound() {
                return Err(StoreError::ConfigBound);
            }
            conversation.config = config.clone();
            Ok(())
        })
    }

    async fn set_initial_system_message(
        &self,
        conversation_id: &Uuid,
        text: &str,
    ) -> Result<(), StoreError> {
        self.with_conversation(conversation_id, |conversation| {
            if conversation.initial_system_message.is_none() {
                conversation.initial_system_message = Some(text.to_string());
            }
            Ok(())
        })
    }

    async fn set_auto_title(&self, conversation_id: &Uuid, title: &str) -> Result<(), StoreError> {
        self.with_conversation(conversation_id, |conversation| {
            conversation.auto_title = Some(title.to_string());
            Ok(())
        })
    }

    async fn pair_memo(&self, dialogue_id: &Uuid, memo_id: &Uuid) -> Result<(), StoreError> {
        // Check both sides before touching either, then write both. Entries
        // are taken one at a time to avoid holding two shard locks at once.
        {
            let dialogue = self
                .conversations
                .get(dialogue_id)
                .ok_or(StoreError::ConversationNotFound)?;
            if dialogue.paired_memo_id.is_some() {
                return Err(StoreError::Conflict("dialogue already paired".to_string()));
            }
        }
        {
            let memo = self
                .conversations
                .get(memo_id)
                .ok_or(StoreError::ConversationNotFound)?;
            if memo.paired_dialogue_id.is_some() {
                return Err(StoreError::Conflict("memo already paired".to_string()));
            }
        }

        self.with_conversation(dialogue_id, |dialogue| {
            dialogue.paired_memo_id = Some(*memo_id);
            Ok(())
        })?;
        self.with_conversation(memo_id, |memo| {
            memo.paired_dialogue_id = Some(*dialogue_id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suasion_types::conversation::Phase;

    fn dialogue() -> Conversation {
        Conversation::new(Phase::Dialogue)
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let store = InMemoryConversationStore::new();
        let conversation = dialogue();
        let id = conversation.id;

        store.create_conversation(&conversation).await.unwrap();
        let loaded = store.get_conversation(&id).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert!(loaded.messages.is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let store = InMemoryConversationStore::new();
        let conversation = dialogue();
        store.create_conversation(&conversation).await.unwrap();
        let result = store.create_conversation(&conversation).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn append_is_immediately_readable() {
        let store = InMemoryConversationStore::new();
        let conversation = dialogue();
        let id = conversation.id;
        store.create_conversation(&conversation).await.unwrap();

        store
            .append_message(&id, &ChatMessage::user("hello"))
            .await
            .unwrap();

        let loaded = store.get_conversation(&id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].text, "hello");
    }

    #[tokio::test]
    async fn patch_touches_only_named_fields() {
        let store = InMemoryConversationStore::new();
        let conversation = dialogue();
        let id = conversation.id;
        store.create_conversation(&conversation).await.unwrap();

        let mut message = ChatMessage::assistant("draft");
        message.typing = true;
        message.origin_llm = Some("gpt-4o".to_string());
        let message_id = message.id;
        store.append_message(&id, &message).await.unwrap();

        store
            .patch_message(&id, &message_id, &MessagePatch::text("final"))
            .await
            .unwrap();

        let loaded = store.get_conversation(&id).await.unwrap().unwrap();
        let patched = &loaded.messages[0];
        assert_eq!(patched.text, "final");
        assert!(patched.typing, "typing untouched by a text-only patch");
        assert_eq!(patched.origin_llm.as_deref(), Some("gpt-4o"));
    }

    #[tokio::test]
    async fn patch_unknown_message_fails() {
        let store = InMemoryConversationStore::new();
        let conversation = dialogue();
        let id = conversation.id;
        store.create_conversation(&conversation).await.unwrap();

        let result = store
            .patch_message(&id, &Uuid::now_v7(), &MessagePatch::typing(false))
            .await;
        assert!(matches!(result, Err(StoreError::MessageNotFound)));
    }

    #[tokio::test]
    async fn bind_config_is_one_shot() {
        let store = InMemoryConversationStore::new();
        let conversation = dialogue();
        let id = conversation.id;
        store.create_conversation(&conversation).await.unwrap();

        let config = PersuasionConfig {
            topic: Some("Topic".to_string()),
            ..PersuasionConfig::default()
        };
        store.bind_config(&id, &config).await.unwrap();

        let result = store.bind_config(&id, &config).await;
        assert!(matches!(result, Err(StoreError::ConfigBound)));
    }

    #[tokio::test]
    async fn snapshot_is_set_once() {
        let store = InMemoryConversationStore::new();
        let conversation = dialogue();
        let id = conversation.id;
        store.create_conversation(&conversation).await.unwrap();

        store.set_initial_system_message(&id, "first").await.unwrap();
        store.set_initial_system_message(&id, "second").await.unwrap();

        let loaded = store.get_conversation(&id).await.unwrap().unwrap();
        assert_eq!(loaded.initial_system_message.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn pairing_rejects_second_memo() {
        let store = InMemoryConversationStore::new();
        let dialogue_conv = dialogue();
        let memo_a = Conversation::new(Phase::Memo);
        let memo_b = Conversation::new(Phase::Memo);
        store.create_conversation(&dialogue_conv).await.unwrap();
        store.create_conversation(&memo_a).await.unwrap();
        store.create_conversation(&memo_b).await.unwrap();

        store.pair_memo(&dialogue_conv.id, &memo_a.id).await.unwrap();
        let result = store.pair_memo(&dialogue_conv.id, &memo_b.id).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        let loaded = store.get_conversation(&dialogue_conv.id).await.unwrap().unwrap();
        assert_eq!(loaded.paired_memo_id, Some(memo_a.id));
        let memo = store.get_conversation(&memo_a.id).await.unwrap().unwrap();
        assert_eq!(memo.paired_dialogue_id, Some(dialogue_conv.id));
    }

    #[tokio::test]
    async fn list_orders_by_creation() {
        let store = InMemoryConversationStore::new();
        let first = dialogue();
        let second = dialogue();
        store.create_conversation(&first).await.unwrap();
        store.create_conversation(&second).await.unwrap();

        let all = store.list_conversations().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at <= all[1].created_at);
    }
}
