//! Conversation, message, and persuasion-configuration types for Suasion.
//!
//! A conversation is either a persuasive dialogue or a memo-writing session,
//! holds an ordered message list, and carries a bind-once persuasion
//! configuration plus an immutable snapshot of the first directive-bearing
//! system prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

pub use crate::llm::MessageRole;
pub use crate::retrieval::RetrievedSnippet;

/// Conversation phase: persuasive dialogue vs neutral memo assistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Dialogue,
    Memo,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Dialogue
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Dialogue => write!(f, "dialogue"),
            Phase::Memo => write!(f, "memo"),
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dialogue" => Ok(Phase::Dialogue),
            "memo" => Ok(Phase::Memo),
            other => Err(format!("invalid phase: '{other}'")),
        }
    }
}

/// The assigned position the assistant argues on a topic.
///
/// Resolved once at the binding boundary; unknown values collapse to
/// `Unset` so a configuration miss omits the section instead of failing
/// the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standpoint {
    Supporting,
    Opposing,
    Unset,
}

impl Default for Standpoint {
    fn default() -> Self {
        Standpoint::Unset
    }
}

impl Standpoint {
    /// Resolve a raw configuration value. Never fails.
    pub fn resolve(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "supporting" => Standpoint::Supporting,
            "opposing" => Standpoint::Opposing,
            _ => Standpoint::Unset,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Standpoint::Unset)
    }
}

impl fmt::Display for Standpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Standpoint::Supporting => write!(f, "supporting"),
            Standpoint::Opposing => write!(f, "opposing"),
            Standpoint::Unset => write!(f, "unset"),
        }
    }
}

/// The conversational tactic used to steer the user toward the standpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Suggestion,
    Clarification,
    Unset,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Unset
    }
}

impl Strategy {
    /// Resolve a raw configuration value. Never fails.
    pub fn resolve(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "suggestion" => Strategy::Suggestion,
            "clarification" => Strategy::Clarification,
            _ => Strategy::Unset,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Strategy::Unset)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Suggestion => write!(f, "suggestion"),
            Strategy::Clarification => write!(f, "clarification"),
            Strategy::Unset => write!(f, "unset"),
        }
    }
}

/// Topic, standpoint, and strategy for a conversation.
///
/// Bound at or before the first user message, then immutable for the life
/// of the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersuasionConfig {
    pub topic: Option<String>,
    #[serde(default)]
    pub standpoint: Standpoint,
    #[serde(default)]
    pub strategy: Strategy,
}

impl PersuasionConfig {
    /// Whether any field has been bound.
    pub fn is_bound(&self) -> bool {
        self.topic.is_some() || self.standpoint.is_set() || self.strategy.is_set()
    }

    /// Whether a persuasive directive (standpoint or strategy) is active.
    pub fn has_directives(&self) -> bool {
        self.standpoint.is_set() || self.strategy.is_set()
    }
}

/// Chat dispatch mode selected by the caller for a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatMode {
    /// Send to the model immediately.
    Immediate,
    /// Send immediately and generate follow-up suggestions afterwards.
    ImmediateFollowUp,
    /// Persist the message without calling the model.
    WriteUser,
    /// Route through the tangent agent.
    Tangent,
    /// Route through image generation.
    DrawImagine,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Immediate => write!(f, "immediate"),
            ChatMode::ImmediateFollowUp => write!(f, "immediate-follow-up"),
            ChatMode::WriteUser => write!(f, "write-user"),
            ChatMode::Tangent => write!(f, "tangent"),
            ChatMode::DrawImagine => write!(f, "draw-imagine"),
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "immediate" => Ok(ChatMode::Immediate),
            "immediate-follow-up" => Ok(ChatMode::ImmediateFollowUp),
            "write-user" => Ok(ChatMode::WriteUser),
            "tangent" | "react" => Ok(ChatMode::Tangent),
            "draw-imagine" => Ok(ChatMode::DrawImagine),
            other => Err(format!("invalid chat mode: '{other}'")),
        }
    }
}

/// A single message within a conversation.
///
/// The id is stable for the life of the message; streaming updates are
/// applied as id-keyed patches, never by replacing the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub text: String,
    /// True only while a stream is in flight for this message.
    #[serde(default)]
    pub typing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_llm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_context: Option<Vec<RetrievedSnippet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message with the given role and text.
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            text: text.into(),
            typing: false,
            origin_llm: None,
            purpose_id: None,
            retrieved_context: None,
            suggestions: None,
            created_at: Utc::now(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }
}

/// An id-keyed partial update to a message.
///
/// Every writer to the shared store applies patches; fields left as `None`
/// are untouched, so interleaved writers never clobber each other's fields.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub text: Option<String>,
    pub typing: Option<bool>,
    pub purpose_id: Option<String>,
    pub retrieved_context: Option<Vec<RetrievedSnippet>>,
    pub suggestions: Option<Vec<String>>,
}

impl MessagePatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn typing(typing: bool) -> Self {
        Self {
            typing: Some(typing),
            ..Self::default()
        }
    }

    /// Apply this patch in place.
    pub fn apply(&self, message: &mut ChatMessage) {
        if let Some(ref text) = self.text {
            message.text = text.clone();
        }
        if let Some(typing) = self.typing {
            message.typing = typing;
        }
        if let Some(ref purpose_id) = self.purpose_id {
            message.purpose_id = Some(purpose_id.clone());
        }
        if let Some(ref ctx) = self.retrieved_context {
            message.retrieved_context = Some(ctx.clone());
        }
        if let Some(ref suggestions) = self.suggestions {
            message.suggestions = Some(suggestions.clone());
        }
    }
}

/// A conversation between a study participant and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    #[serde(default)]
    pub phase: Phase,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub config: PersuasionConfig,
    /// Audit snapshot of the first directive-bearing system prompt, fully
    /// resolved. Set once, never overwritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_system_message: Option<String>,
    /// Back-reference to the paired memo conversation (dialogue side).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired_memo_id: Option<Uuid>,
    /// Back-reference to the paired dialogue conversation (memo side).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired_dialogue_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation in the given phase.
    pub fn new(phase: Phase) -> Self {
        Self {
            id: Uuid::now_v7(),
            phase,
            messages: Vec::new(),
            config: PersuasionConfig::default(),
            initial_system_message: None,
            paired_memo_id: None,
            paired_dialogue_id: None,
            auto_title: None,
            created_at: Utc::now(),
        }
    }

    /// Whether any user message has been sent (the conversation has started).
    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(|m| m.role == MessageRole::User)
    }

    /// The pairing partner, whichever side this conversation is on.
    pub fn paired_id(&self) -> Option<Uuid> {
        self.paired_memo_id.or(self.paired_dialogue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_roundtrip() {
        for phase in [Phase::Dialogue, Phase::Memo] {
            let s = phase.to_string();
            let parsed: Phase = s.parse().unwrap();
            assert_eq!(phase, parsed);
        }
    }

    #[test]
    fn test_standpoint_resolve_known() {
        assert_eq!(Standpoint::resolve("supporting"), Standpoint::Supporting);
        assert_eq!(Standpoint::resolve("Opposing"), Standpoint::Opposing);
        assert_eq!(Standpoint::resolve("  opposing "), Standpoint::Opposing);
    }

    #[test]
    fn test_standpoint_resolve_unknown_is_unset() {
        assert_eq!(Standpoint::resolve("neutral"), Standpoint::Unset);
        assert_eq!(Standpoint::resolve(""), Standpoint::Unset);
    }

    #[test]
    fn test_strategy_resolve() {
        assert_eq!(Strategy::resolve("suggestion"), Strategy::Suggestion);
        assert_eq!(Strategy::resolve("clarification"), Strategy::Clarification);
        assert_eq!(Strategy::resolve("socratic"), Strategy::Unset);
    }

    #[test]
    fn test_persuasion_config_binding_flags() {
        let mut config = PersuasionConfig::default();
        assert!(!config.is_bound());
        assert!(!config.has_directives());

        config.topic = Some("Cell phones in schools".to_string());
        assert!(config.is_bound());
        assert!(!config.has_directives());

        config.standpoint = Standpoint::Opposing;
        assert!(config.has_directives());
    }

    #[test]
    fn test_chat_mode_roundtrip() {
        for mode in [
            ChatMode::Immediate,
            ChatMode::ImmediateFollowUp,
            ChatMode::WriteUser,
            ChatMode::Tangent,
            ChatMode::DrawImagine,
        ] {
            let s = mode.to_string();
            let parsed: ChatMode = s.parse().unwrap();
            assert_eq!(mode, parsed);
        }
    }

    #[test]
    fn test_chat_mode_react_alias() {
        let parsed: ChatMode = "react".parse().unwrap();
        assert_eq!(parsed, ChatMode::Tangent);
    }

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::assistant("hello");
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.text, "hello");
        assert!(!msg.typing);
        assert!(msg.retrieved_context.is_none());
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut msg = ChatMessage::assistant("partial");
        msg.typing = true;
        msg.purpose_id = Some("dialogue".to_string());

        MessagePatch::text("partial text grew").apply(&mut msg);
        assert_eq!(msg.text, "partial text grew");
        assert!(msg.typing, "patch without typing must not clear it");
        assert_eq!(msg.purpose_id.as_deref(), Some("dialogue"));

        MessagePatch::typing(false).apply(&mut msg);
        assert!(!msg.typing);
        assert_eq!(msg.text, "partial text grew");
    }

    #[test]
    fn test_conversation_new_is_empty() {
        let convo = Conversation::new(Phase::Dialogue);
        assert!(convo.messages.is_empty());
        assert!(!convo.has_user_messages());
        assert!(convo.initial_system_message.is_none());
        assert!(convo.paired_id().is_none());
    }

    #[test]
    fn test_paired_id_prefers_either_side() {
        let mut dialogue = Conversation::new(Phase::Dialogue);
        let memo_id = Uuid::now_v7();
        dialogue.paired_memo_id = Some(memo_id);
        assert_eq!(dialogue.paired_id(), Some(memo_id));

        let mut memo = Conversation::new(Phase::Memo);
        let dialogue_id = Uuid::now_v7();
        memo.paired_dialogue_id = Some(dialogue_id);
        assert_eq!(memo.paired_id(), Some(dialogue_id));
    }
}
