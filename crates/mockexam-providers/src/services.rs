//! The exam services implemented on top of any `LlmProvider`.
//!
//! Each call builds one prompt, extracts the JSON document from the
//! completion, and converts it from a private wire shape into the domain
//! type. Anything that does not fit the schema is an error; the grading
//! adapters in core decide whether that is fatal.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use mockexam_core::engine::ExamServices;
use mockexam_core::model::{ContentArea, GeneratedItem, OptionKey, OptionSet, Stimulus, VisualAid};
use mockexam_core::scoring::ObjectiveSummary;
use mockexam_core::traits::{
    extract_json_from_markdown, CompletionRequest, EssayGrade, EssayGrader, Feedback,
    FeedbackSynthesizer, ItemSource, LlmProvider,
};

const ITEMS_MAX_TOKENS: u32 = 8192;
const GRADING_MAX_TOKENS: u32 = 2048;
/// Grading and feedback run colder than item generation.
const GRADING_TEMPERATURE: f64 = 0.2;

/// LLM-backed generation, essay grading and feedback.
pub struct LlmExamServices {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
}

impl LlmExamServices {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
        }
    }

    /// Sampling temperature for item generation.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Share one instance as all three engine services.
    pub fn into_services(self) -> ExamServices {
        let shared = Arc::new(self);
        ExamServices {
            items: shared.clone(),
            essays: shared.clone(),
            feedback: shared,
        }
    }

    async fn ask(&self, prompt: String, max_tokens: u32, temperature: f64) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            prompt,
            system_prompt: None,
            max_tokens,
            temperature,
        };
        let response = self.provider.complete(&request).await?;
        tracing::debug!(
            provider = self.provider.name(),
            model = %response.model,
            tokens = response.token_usage.total_tokens,
            latency_ms = response.latency_ms,
            "completion received"
        );
        Ok(extract_json_from_markdown(&response.content))
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn items_prompt(area: ContentArea, count: usize, seed: &str) -> String {
    format!(
        r#"Generate {count} multiple-choice items for the area "{label}" of a national secondary school exit exam.

Variation seed: {seed}. Use it to vary topics and stimuli; never repeat items you would produce for a different seed.

Each item has a stimulus (a short text with its attribution), a prompt, five options keyed A to E with exactly one correct answer, the competency it assesses, and an explanation of the correct answer. An item may carry a visual aid: a chart (bar, line or pie, with a series of label/value points), a table (columns and rows), or a comic strip (panels of speaker and line).

Respond with JSON:
{{"items": [{{
  "competency_tag": "H12",
  "stimulus": {{"text": "...", "attribution": "..."}},
  "prompt": "...",
  "options": {{"A": "...", "B": "...", "C": "...", "D": "...", "E": "..."}},
  "correct_option": "C",
  "explanation": "...",
  "visual_aid": {{"type": "none"}}
}}]}}"#,
        label = area.label(),
    )
}

fn essay_prompt(theme: &str, text: &str) -> String {
    format!(
        r#"Grade the essay below, written on the theme "{theme}".

Score each of the five competencies from 0 to 200 in steps of 40:
1. Mastery of the formal written language.
2. Understanding of the theme and use of knowledge from several areas.
3. Selection and organization of arguments in defense of a point of view.
4. Command of the linguistic mechanisms of argumentation.
5. A detailed intervention proposal that respects human rights.

Respond with JSON:
{{"competencies": [c1, c2, c3, c4, c5], "total": <sum>, "narrative": "...", "strengths": ["..."], "improvements": ["..."]}}

Essay:
"""
{text}
""""#
    )
}

fn feedback_prompt(summary: &ObjectiveSummary, essay_total: Option<u32>) -> String {
    let missed = if summary.missed_competencies.is_empty() {
        "none".to_string()
    } else {
        summary.missed_competencies.join(", ")
    };
    let essay = match essay_total {
        Some(total) => format!("{total} out of 1000"),
        None => "not graded".to_string(),
    };
    format!(
        r#"Write study feedback for a student who just finished a mock exam.

Objective accuracy: {accuracy:.0}%
Estimated objective score: {score} (scale 300 to 900)
Competencies missed: {missed}
Essay score: {essay}

Do not comment on an essay score that is marked as not graded.

Respond with JSON:
{{"narrative": "...", "weak_areas": ["..."], "study_tips": ["..."], "next_goal": "..."}}"#,
        accuracy = summary.accuracy * 100.0,
        score = summary.estimated_score,
    )
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemsPayload {
    Wrapped { items: Vec<WireItem> },
    Bare(Vec<WireItem>),
}

#[derive(Deserialize)]
struct WireItem {
    #[serde(alias = "competencyTag", alias = "competency")]
    competency_tag: String,
    stimulus: WireStimulus,
    prompt: String,
    options: BTreeMap<String, String>,
    #[serde(alias = "correctOption", alias = "answer")]
    correct_option: String,
    #[serde(default)]
    explanation: String,
    #[serde(default, alias = "visualAid")]
    visual_aid: Option<VisualAid>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireStimulus {
    Text(String),
    Full {
        text: String,
        #[serde(default, alias = "source")]
        attribution: String,
    },
}

impl WireItem {
    fn into_generated(self) -> Result<GeneratedItem, String> {
        let mut options = BTreeMap::new();
        for (key, text) in self.options {
            let key: OptionKey = key.parse()?;
            if options.insert(key, text).is_some() {
                return Err(format!("option {key} appears more than once"));
            }
        }
        let options = OptionSet::try_from(options)?;
        let correct_option: OptionKey = self.correct_option.parse()?;

        let stimulus = match self.stimulus {
            WireStimulus::Text(text) => Stimulus {
                text,
                attribution: String::new(),
            },
            WireStimulus::Full { text, attribution } => Stimulus { text, attribution },
        };

        let item = GeneratedItem {
            competency_tag: self.competency_tag.trim().to_string(),
            stimulus,
            prompt: self.prompt,
            options,
            correct_option,
            explanation: self.explanation,
            visual_aid: self.visual_aid.unwrap_or_default(),
        };
        item.validate()?;
        Ok(item)
    }
}

#[derive(Deserialize)]
struct WireEssayGrade {
    #[serde(alias = "scores")]
    competencies: Vec<u32>,
    total: u32,
    #[serde(default, alias = "comment")]
    narrative: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default, alias = "improvement_points")]
    improvements: Vec<String>,
}

#[derive(Deserialize)]
struct WireFeedback {
    narrative: String,
    #[serde(default, alias = "weakAreas")]
    weak_areas: Vec<String>,
    #[serde(default, alias = "studyTips")]
    study_tips: Vec<String>,
    #[serde(default, alias = "nextGoal")]
    next_goal: String,
}

pub(crate) fn parse_items(json: &str, count: usize) -> Result<Vec<GeneratedItem>> {
    let payload: ItemsPayload =
        serde_json::from_str(json).context("item batch is not valid JSON in the expected shape")?;
    let wire = match payload {
        ItemsPayload::Wrapped { items } | ItemsPayload::Bare(items) => items,
    };
    anyhow::ensure!(
        wire.len() == count,
        "expected {count} items, got {}",
        wire.len()
    );

    wire.into_iter()
        .enumerate()
        .map(|(i, item)| {
            item.into_generated()
                .map_err(|e| anyhow::anyhow!("item {} is invalid: {e}", i + 1))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Service impls
// ---------------------------------------------------------------------------

#[async_trait]
impl ItemSource for LlmExamServices {
    async fn generate(
        &self,
        area: ContentArea,
        count: usize,
        seed: &str,
    ) -> Result<Vec<GeneratedItem>> {
        let json = self
            .ask(items_prompt(area, count, seed), ITEMS_MAX_TOKENS, self.temperature)
            .await?;
        parse_items(&json, count).with_context(|| format!("bad item batch for {area}"))
    }
}

#[async_trait]
impl EssayGrader for LlmExamServices {
    async fn grade_essay(&self, theme: &str, text: &str) -> Result<EssayGrade> {
        let json = self
            .ask(essay_prompt(theme, text), GRADING_MAX_TOKENS, GRADING_TEMPERATURE)
            .await?;
        let wire: WireEssayGrade =
            serde_json::from_str(&json).context("essay grade is not valid JSON in the expected shape")?;
        Ok(EssayGrade {
            competencies: wire.competencies,
            total: wire.total,
            narrative: wire.narrative,
            strengths: wire.strengths,
            improvements: wire.improvements,
        })
    }
}

#[async_trait]
impl FeedbackSynthesizer for LlmExamServices {
    async fn synthesize_feedback(
        &self,
        summary: &ObjectiveSummary,
        essay_total: Option<u32>,
    ) -> Result<Feedback> {
        let json = self
            .ask(
                feedback_prompt(summary, essay_total),
                GRADING_MAX_TOKENS,
                GRADING_TEMPERATURE,
            )
            .await?;
        let wire: WireFeedback =
            serde_json::from_str(&json).context("feedback is not valid JSON in the expected shape")?;
        Ok(Feedback {
            narrative: wire.narrative,
            weak_areas: wire.weak_areas,
            study_tips: wire.study_tips,
            next_goal: wire.next_goal,
        })
    }
}
