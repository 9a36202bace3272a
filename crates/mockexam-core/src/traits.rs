//! Trait definitions for LLM providers and the external exam services.
//!
//! `LlmProvider` is implemented by the HTTP clients in `mockexam-providers`.
//! The three service traits are what the engine actually talks to; the
//! providers crate implements them on top of any `LlmProvider`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ContentArea, GeneratedItem};
use crate::report::SessionRecord;
use crate::scoring::ObjectiveSummary;

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for LLM backends that turn a prompt into text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Complete a prompt.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request for a single completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "claude-sonnet-4-20250514").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Cost per 1K input tokens in USD.
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens in USD.
    pub cost_per_1k_output: f64,
}

// ---------------------------------------------------------------------------
// Exam services
// ---------------------------------------------------------------------------

/// Content generation: produces exam items for an area.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Generate exactly `count` items. The seed varies content between
    /// requests for the same area within one session.
    async fn generate(
        &self,
        area: ContentArea,
        count: usize,
        seed: &str,
    ) -> anyhow::Result<Vec<GeneratedItem>>;
}

/// Raw output of the essay grading service, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayGrade {
    pub competencies: Vec<u32>,
    pub total: u32,
    pub narrative: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

/// Free-text grading against the five essay competencies.
#[async_trait]
pub trait EssayGrader: Send + Sync {
    async fn grade_essay(&self, theme: &str, text: &str) -> anyhow::Result<EssayGrade>;
}

/// Narrative study guidance built from a score summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub narrative: String,
    #[serde(default)]
    pub weak_areas: Vec<String>,
    #[serde(default)]
    pub study_tips: Vec<String>,
    #[serde(default)]
    pub next_goal: String,
}

#[async_trait]
pub trait FeedbackSynthesizer: Send + Sync {
    async fn synthesize_feedback(
        &self,
        summary: &ObjectiveSummary,
        essay_total: Option<u32>,
    ) -> anyhow::Result<Feedback>;
}

/// Downstream receiver of finished session summaries.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn record(&self, record: &SessionRecord) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Extract a JSON document from a markdown-formatted LLM response.
///
/// Handles:
/// - A ```json``` block (the first one wins)
/// - A generic ``` block (if no json-specific block is found)
/// - Bare JSON surrounded by prose (outermost `{...}` or `[...]`)
/// - Anything else is returned trimmed, for the parser to reject
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_block: Option<String> = None;
    let mut generic_block: Option<String> = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block && json_block.is_none() {
                json_block = Some(current_block.clone());
            } else if is_generic_block && generic_block.is_none() {
                generic_block = Some(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated (unclosed) block: keep what was accumulated
    if in_block && !current_block.is_empty() {
        if is_json_block && json_block.is_none() {
            json_block = Some(current_block);
        } else if is_generic_block && generic_block.is_none() {
            generic_block = Some(current_block);
        }
    }

    if let Some(block) = json_block.or(generic_block) {
        return block.trim().to_string();
    }

    bare_json_span(response)
        .unwrap_or(response)
        .trim()
        .to_string()
}

/// The span from the first opening bracket to the last matching closer.
fn bare_json_span(response: &str) -> Option<&str> {
    let start = response.find(['{', '['])?;
    let closer = if response[start..].starts_with('{') {
        '}'
    } else {
        ']'
    };
    let end = response.rfind(closer)?;
    (end > start).then(|| &response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_block() {
        let input = "Here are the items:\n\n```json\n{\"items\": []}\n```\n\nGood luck!";
        assert_eq!(extract_json_from_markdown(input), "{\"items\": []}");
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\nnot this\n```\n\n```json\n[1, 2]\n```\n";
        assert_eq!(extract_json_from_markdown(input), "[1, 2]");
    }

    #[test]
    fn extract_generic_block_fallback() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_from_markdown(input), "{\"a\": 1}");
    }

    #[test]
    fn extract_bare_json_in_prose() {
        let input = "Sure! {\"total\": 680, \"narrative\": \"ok\"} Hope this helps.";
        assert_eq!(
            extract_json_from_markdown(input),
            "{\"total\": 680, \"narrative\": \"ok\"}"
        );
    }

    #[test]
    fn extract_truncated_unclosed_block() {
        let input = "```json\n{\"items\": [\n  {\"prompt\": \"x\"}";
        let json = extract_json_from_markdown(input);
        assert!(json.starts_with("{\"items\""), "got: {json}");
    }

    #[test]
    fn extract_without_json_returns_trimmed_text() {
        assert_eq!(extract_json_from_markdown("  no json here \n"), "no json here");
    }
}
