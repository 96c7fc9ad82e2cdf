//! Deterministic system-prompt composition.
//!
//! The composer is a pure function of {phase, topic, standpoint, strategy}
//! plus the current date. It operates on a defensive copy of the history:
//! the caller's slice is never mutated, any existing system message is
//! removed (content discarded, not merged), and the freshly composed system
//! message lands at index 0.

use chrono::NaiveDate;

use suasion_types::conversation::{ChatMessage, PersuasionConfig, Phase};

use super::templates;

/// Purpose identifier stamped on dialogue-phase system and assistant messages.
pub const PURPOSE_DIALOGUE: &str = "persuasive-dialogue";

/// Purpose identifier stamped on memo-phase system and assistant messages.
pub const PURPOSE_MEMO: &str = "memo-assistant";

/// Builds the per-turn system message from the conversation configuration.
pub struct PromptComposer;

impl PromptComposer {
    /// Compose the system prompt text for the given phase and configuration.
    ///
    /// Section order for the dialogue phase: base instructions, topic line,
    /// standpoint instructions, strategy instructions, concealment clause.
    /// Sections are blank-line joined; omitted sections leave no stray
    /// separators. A dialogue conversation with nothing bound gets the
    /// neutral fallback prompt. The memo phase uses the fixed memo template,
    /// prefixed with a topic line only when a topic is set, and never carries
    /// standpoint or strategy text.
    ///
    /// Composing twice from the same inputs and date yields byte-identical
    /// text.
    pub fn compose(phase: Phase, config: &PersuasionConfig, today: NaiveDate) -> String {
        let text = match phase {
            Phase::Memo => {
                let mut sections = Vec::with_capacity(2);
                if let Some(ref topic) = config.topic {
                    sections.push(templates::memo_topic_line(topic));
                }
                sections.push(templates::MEMO_PROMPT.to_string());
                sections.join("\n\n")
            }
            Phase::Dialogue if !config.is_bound() => templates::FALLBACK_SYSTEM_PROMPT.to_string(),
            Phase::Dialogue => {
                let mut sections = Vec::with_capacity(5);
                sections.push(templates::DIALOGUE_BASE_PROMPT.to_string());
                if let Some(ref topic) = config.topic {
                    sections.push(templates::dialogue_topic_line(topic));
                }
                if let Some(instructions) = templates::standpoint_instructions(config.standpoint) {
                    sections.push(instructions.to_string());
                }
                if let Some(instructions) = templates::strategy_instructions(config.strategy) {
                    sections.push(instructions.to_string());
                }
                if config.has_directives() {
                    sections.push(templates::CONCEALMENT_CLAUSE.to_string());
                }
                sections.join("\n\n")
            }
        };

        substitute_date(&text, today)
    }

    /// Purpose identifier for messages produced under the given phase.
    pub fn purpose_id(phase: Phase) -> &'static str {
        match phase {
            Phase::Dialogue => PURPOSE_DIALOGUE,
            Phase::Memo => PURPOSE_MEMO,
        }
    }

    /// Build the effective history for a turn: a copy of `history` with any
    /// existing system messages removed and the composed system message at
    /// index 0. The caller's slice is untouched.
    pub fn rebuild_history(
        phase: Phase,
        config: &PersuasionConfig,
        history: &[ChatMessage],
        today: NaiveDate,
    ) -> Vec<ChatMessage> {
        let mut system = ChatMessage::system(Self::compose(phase, config, today));
        system.purpose_id = Some(Self::purpose_id(phase).to_string());

        let mut rebuilt = Vec::with_capacity(history.len() + 1);
        rebuilt.push(system);
        rebuilt.extend(
            history
                .iter()
                .filter(|m| m.role != suasion_types::llm::MessageRole::System)
                .cloned(),
        );
        rebuilt
    }
}

/// Replace every occurrence of the date placeholder with `YYYY-MM-DD`.
fn substitute_date(text: &str, today: NaiveDate) -> String {
    text.replace(
        templates::DATE_PLACEHOLDER,
        &today.format("%Y-%m-%d").to_string(),
    )
}
