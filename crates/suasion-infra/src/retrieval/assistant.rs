//! HTTP client for an assistant-style context-retrieval service.
//!
//! Queries a named assistant index for snippets relevant to the current
//! user turn and assembles the enhanced system message by appending a
//! retrieved-context block to the composed prompt. Strictly best-effort:
//! the turn executor absorbs every error returned here.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use suasion_core::retrieval::ContextRetriever;
use suasion_types::config::RetrievalConfig;
use suasion_types::conversation::ChatMessage;
use suasion_types::llm::MessageRole;
use suasion_types::retrieval::{RetrievalError, RetrievalOutcome, RetrievedSnippet};

/// Retriever backed by an assistant context endpoint.
pub struct AssistantContextRetriever {
    client: Client,
    base_url: String,
    assistant_name: String,
    api_key: SecretString,
    top_k: u32,
    snippet_size: u32,
    min_score: f32,
}

impl AssistantContextRetriever {
    /// Build a retriever from the retrieval configuration.
    ///
    /// Fails with [`RetrievalError::Disabled`] when no base URL is set.
    pub fn new(config: &RetrievalConfig, api_key: SecretString) -> Result<Self, RetrievalError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or(RetrievalError::Disabled)?
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::new(),
            base_url,
            assistant_name: config.assistant_name.clone(),
            api_key,
            top_k: config.top_k,
            snippet_size: config.snippet_size,
            min_score: config.min_score,
        })
    }
}

#[derive(Serialize)]
struct ContextRequest<'a> {
    query: &'a str,
    top_k: u32,
    snippet_size: u32,
}

#[derive(Deserialize)]
struct ContextResponse {
    #[serde(default)]
    snippets: Vec<WireSnippet>,
}

#[derive(Deserialize)]
struct WireSnippet {
    content: String,
    score: f32,
    #[serde(default)]
    source: Option<String>,
}

impl ContextRetriever for AssistantContextRetriever {
    async fn retrieve(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let url = format!(
            "{}/assistant/chat/{}/context",
            self.base_url, self.assistant_name
        );

        let response = self
            .client
            .post(&url)
            .header("Api-Key", self.api_key.expose_secret())
            .json(&ContextRequest {
                query,
                top_k: self.top_k,
                snippet_size: self.snippet_size,
            })
            .send()
            .await
            .map_err(|e| RetrievalError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RetrievalError::Http(format!(
                "context endpoint returned {}",
                response.status()
            )));
        }

        let body: ContextResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Deserialization(e.to_string()))?;

        let snippets = filter_snippets(body.snippets, self.min_score);
        if snippets.is_empty() {
            debug!(query_len = query.len(), "no snippets above threshold");
            return Ok(RetrievalOutcome::default());
        }

        let base_prompt = history
            .first()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.text.as_str())
            .unwrap_or_default();
        let enhanced = format!(
            "{base_prompt}\n\n{}",
            format_snippets_for_prompt(&snippets)
        );

        Ok(RetrievalOutcome {
            should_enhance: true,
            enhanced_system_text: Some(enhanced),
            snippets,
        })
    }
}

/// Drop snippets scoring below the threshold, best first.
fn filter_snippets(snippets: Vec<WireSnippet>, min_score: f32) -> Vec<RetrievedSnippet> {
    let mut kept: Vec<RetrievedSnippet> = snippets
        .into_iter()
        .filter(|s| s.score >= min_score)
        .map(|s| RetrievedSnippet {
            content: s.content,
            score: s.score,
            source: s.source,
        })
        .collect();
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept
}

/// Render snippets as a retrieved-context block for the system prompt.
fn format_snippets_for_prompt(snippets: &[RetrievedSnippet]) -> String {
    let mut block = String::from(
        "Relevant background retrieved for this conversation. Draw on it where it helps, \
         without quoting it verbatim or mentioning that it was retrieved:\n",
    );
    for (i, snippet) in snippets.iter().enumerate() {
        let source = snippet
            .source
            .as_deref()
            .map(|s| format!(" (source: {s})"))
            .unwrap_or_default();
        block.push_str(&format!("\n[{}]{source} {}", i + 1, snippet.content.trim()));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(content: &str, score: f32) -> WireSnippet {
        WireSnippet {
            content: content.to_string(),
            score,
            source: None,
        }
    }

    #[test]
    fn test_filter_drops_low_scores_and_sorts() {
        let snippets = filter_snippets(
            vec![wire("low", 0.2), wire("high", 0.9), wire("mid", 0.5)],
            0.4,
        );
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].content, "high");
        assert_eq!(snippets[1].content, "mid");
    }

    #[test]
    fn test_format_numbers_snippets_with_sources() {
        let snippets = vec![
            RetrievedSnippet {
                content: "Phones distract students.".to_string(),
                score: 0.9,
                source: Some("survey.pdf".to_string()),
            },
            RetrievedSnippet {
                content: "Some schools ban them entirely.".to_string(),
                score: 0.8,
                source: None,
            },
        ];
        let block = format_snippets_for_prompt(&snippets);
        assert!(block.contains("[1] (source: survey.pdf) Phones distract students."));
        assert!(block.contains("[2] Some schools ban them entirely."));
        assert!(block.contains("without quoting it verbatim"));
    }

    #[test]
    fn test_new_without_base_url_is_disabled() {
        let config = RetrievalConfig::default();
        let result = AssistantContextRetriever::new(&config, SecretString::from("key"));
        assert!(matches!(result, Err(RetrievalError::Disabled)));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = RetrievalConfig {
            enabled: true,
            base_url: Some("https://retrieval.example.com/".to_string()),
            ..RetrievalConfig::default()
        };
        let retriever =
            AssistantContextRetriever::new(&config, SecretString::from("key")).unwrap();
        assert_eq!(retriever.base_url, "https://retrieval.example.com");
    }

    #[test]
    fn test_context_response_defaults_to_empty() {
        let parsed: ContextResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.snippets.is_empty());
    }
}
