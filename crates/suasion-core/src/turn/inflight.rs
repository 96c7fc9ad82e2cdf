//! Per-conversation in-flight stream slots.
//!
//! At most one stream may be active per conversation. Starting a new turn
//! supersedes the previous one: `begin` atomically stores a fresh token and
//! cancels whatever it replaced. Slot cleanup is generation-checked so a
//! superseded turn's cleanup never evicts the superseding turn's token.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Handle for one turn's occupancy of a conversation slot.
#[derive(Debug, Clone)]
pub struct TurnGuard {
    pub conversation_id: Uuid,
    pub token: CancellationToken,
    generation: u64,
}

/// Map from conversation id to the cancellation handle of its in-flight turn.
#[derive(Debug, Default)]
pub struct InflightRegistry {
    slots: DashMap<Uuid, (u64, CancellationToken)>,
    counter: AtomicU64,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a new turn, cancelling any previous occupant.
    pub fn begin(&self, conversation_id: Uuid) -> TurnGuard {
        let generation = self.counter.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        if let Some((_, previous)) = self
            .slots
            .insert(conversation_id, (generation, token.clone()))
        {
            previous.cancel();
        }

        TurnGuard {
            conversation_id,
            token,
            generation,
        }
    }

    /// Release the slot when the guarded turn settles.
    ///
    /// Only removes the slot while it still belongs to this guard's turn.
    pub fn finish(&self, guard: &TurnGuard) {
        self.slots
            .remove_if(&guard.conversation_id, |_, (generation, _)| {
                *generation == guard.generation
            });
    }

    /// Cancel the in-flight turn for a conversation, if any.
    pub fn cancel(&self, conversation_id: &Uuid) -> bool {
        match self.slots.remove(conversation_id) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a turn is currently in flight for the conversation.
    pub fn is_active(&self, conversation_id: &Uuid) -> bool {
        self.slots.contains_key(conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_claims_slot() {
        let registry = InflightRegistry::new();
        let id = Uuid::now_v7();

        let guard = registry.begin(id);
        assert!(registry.is_active(&id));
        assert!(!guard.token.is_cancelled());
    }

    #[test]
    fn begin_supersedes_previous_turn() {
        let registry = InflightRegistry::new();
        let id = Uuid::now_v7();

        let first = registry.begin(id);
        let second = registry.begin(id);

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert!(registry.is_active(&id));
    }

    #[test]
    fn stale_finish_leaves_newer_slot_intact() {
        let registry = InflightRegistry::new();
        let id = Uuid::now_v7();

        let first = registry.begin(id);
        let second = registry.begin(id);

        // The superseded turn cleans up after observing cancellation.
        registry.finish(&first);
        assert!(registry.is_active(&id), "newer slot must survive");

        registry.finish(&second);
        assert!(!registry.is_active(&id));
    }

    #[test]
    fn cancel_empties_slot() {
        let registry = InflightRegistry::new();
        let id = Uuid::now_v7();

        let guard = registry.begin(id);
        assert!(registry.cancel(&id));
        assert!(guard.token.is_cancelled());
        assert!(!registry.is_active(&id));
        assert!(!registry.cancel(&id));
    }

    #[test]
    fn separate_conversations_have_separate_slots() {
        let registry = InflightRegistry::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        let guard_a = registry.begin(a);
        let _guard_b = registry.begin(b);

        assert!(!guard_a.token.is_cancelled());
        assert!(registry.is_active(&a));
        assert!(registry.is_active(&b));
    }
}
