use thiserror::Error;

use crate::llm::LlmError;

/// Errors from conversation-store operations (used by the trait definition
/// in suasion-core; implementations live in suasion-infra).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation not found")]
    ConversationNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("persuasion config already bound")]
    ConfigBound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors distinguished at the turn-executor boundary.
///
/// Everything else (augmentation failure, configuration miss, side-effect
/// failure) is absorbed at the component that produced it.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Stream or network failure. Partial content is retained; no retry.
    #[error("transport failure: {0}")]
    Transport(#[from] LlmError),

    /// Expected termination, not an error.
    #[error("turn cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from conversation-state transitions.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("persuasion config already bound")]
    ConfigBound,

    #[error("conversation already paired")]
    AlreadyPaired,

    #[error("conversation not found")]
    NotFound,

    #[error("operation requires {required} phase, conversation is {actual}")]
    PhaseMismatch { required: String, actual: String },
}

/// Errors from speech-synthesis calls. Callers fire and forget; these are
/// only ever logged.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Http(String),

    #[error("speech synthesis is not configured")]
    Disabled,
}

/// Errors from auxiliary agents (image generation, tangent agent).
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent call failed: {0}")]
    Failed(String),

    #[error("agent is not configured")]
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict("duplicate pairing".to_string());
        assert_eq!(err.to_string(), "conflict: duplicate pairing");
    }

    #[test]
    fn test_turn_error_from_llm_error() {
        let err: TurnError = LlmError::Stream("connection reset".to_string()).into();
        assert!(matches!(err, TurnError::Transport(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_state_error_display() {
        let err = StateError::PhaseMismatch {
            required: "dialogue".to_string(),
            actual: "memo".to_string(),
        };
        assert!(err.to_string().contains("dialogue"));
        assert!(err.to_string().contains("memo"));
    }
}
