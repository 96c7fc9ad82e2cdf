//! Turn lifecycle events for Suasion.
//!
//! Published on the broadcast event bus by the turn executor and the
//! side-effect scheduler so live consumers (the CLI renderer, exports)
//! can follow a turn without polling the store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted over the life of an assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A placeholder assistant message was created and the turn began.
    TurnStarted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// Accumulated text grew by a delta.
    TextDelta {
        conversation_id: Uuid,
        message_id: Uuid,
        text: String,
    },

    /// The first-line speech synthesis call was dispatched.
    SpeechDispatched {
        conversation_id: Uuid,
        message_id: Uuid,
        /// Length of the spoken opening segment in characters.
        chars: usize,
    },

    /// The stream closed normally.
    TurnCompleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// The turn was superseded or aborted; partial content remains.
    TurnCancelled {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// The stream failed; partial content remains.
    TurnFailed {
        conversation_id: Uuid,
        message_id: Uuid,
        error: String,
    },

    /// Follow-up suggestions were attached to the message.
    SuggestionsReady {
        conversation_id: Uuid,
        message_id: Uuid,
        count: usize,
    },

    /// An auto-generated title was stored.
    TitleSet {
        conversation_id: Uuid,
        title: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_tagged() {
        let event = TurnEvent::TurnStarted {
            conversation_id: Uuid::now_v7(),
            message_id: Uuid::now_v7(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"turn_started\""));
    }

    #[test]
    fn test_delta_event_carries_text() {
        let event = TurnEvent::TextDelta {
            conversation_id: Uuid::now_v7(),
            message_id: Uuid::now_v7(),
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: TurnEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, TurnEvent::TextDelta { text, .. } if text == "hello"));
    }
}
