//! ConversationStore trait definition.
//!
//! The shared conversation store every engine component writes through.
//! Implementations live in suasion-infra and must give a synchronous
//! read-after-write guarantee within one process; writers apply targeted
//! per-message-id patches, never whole-list replacement, except through the
//! dedicated `replace_messages` operation used by history syncs.

use suasion_types::conversation::{ChatMessage, Conversation, MessagePatch, PersuasionConfig};
use suasion_types::error::StoreError;
use uuid::Uuid;

/// Store trait for conversation and message persistence.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationStore: Send + Sync {
    /// Create a new conversation.
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Get a conversation by its unique ID.
    fn get_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, StoreError>> + Send;

    /// List all conversations, ordered by creation time.
    fn list_conversations(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, StoreError>> + Send;

    /// Append a message to a conversation.
    fn append_message(
        &self,
        conversation_id: &Uuid,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Apply an id-keyed patch to a message.
    fn patch_message(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        patch: &MessagePatch,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Replace the full message list of a conversation (history sync).
    fn replace_messages(
        &self,
        conversation_id: &Uuid,
        messages: &[ChatMessage],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Bind the persuasion configuration. Fails with
    /// [`StoreError::ConfigBound`] if any field is already set.
    fn bind_config(
        &self,
        conversation_id: &Uuid,
        config: &PersuasionConfig,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Persist the initial system-message snapshot. A no-op when a snapshot
    /// already exists (set once, never overwritten).
    fn set_initial_system_message(
        &self,
        conversation_id: &Uuid,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Set the auto-generated conversation title.
    fn set_auto_title(
        &self,
        conversation_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Establish the 1:1 dialogue/memo pairing, both directions. Fails with
    /// [`StoreError::Conflict`] if either side is already paired.
    fn pair_memo(
        &self,
        dialogue_id: &Uuid,
        memo_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
