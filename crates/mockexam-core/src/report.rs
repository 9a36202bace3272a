//! Grading result types, the result aggregator, and JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::{EssayAssessment, GradingInput, MAX_ESSAY_SCORE};
use crate::model::ContentArea;
use crate::scoring::{ObjectiveResult, MAX_SCORE};
use crate::traits::Feedback;

/// The terminal report of a session. Produced once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub areas: Vec<ContentArea>,
    pub include_essay: bool,
    #[serde(default)]
    pub essay_theme: Option<String>,
    pub time_spent_secs: u64,
    pub objective: ObjectiveResult,
    /// `None` when no essay was written, it was too short, or grading failed.
    pub essay: Option<EssayAssessment>,
    /// `None` when the feedback service failed.
    pub feedback: Option<Feedback>,
    /// Objective score plus essay total.
    pub total_score: u32,
    /// 900, plus 1000 when the essay was part of the exam.
    pub max_score: u32,
}

/// Merges the score curve output with the optional adapter outputs.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Never fails: a missing essay or feedback simply leaves that section out.
    pub fn aggregate(
        input: &GradingInput,
        objective: ObjectiveResult,
        essay: Option<EssayAssessment>,
        feedback: Option<Feedback>,
    ) -> GradingResult {
        let include_essay = input.configuration.include_essay;
        let total_score = objective.estimated_score + essay.as_ref().map_or(0, |e| e.total);
        let max_score = MAX_SCORE + if include_essay { MAX_ESSAY_SCORE } else { 0 };

        GradingResult {
            session_id: input.session_id,
            started_at: input.started_at,
            completed_at: Utc::now(),
            areas: input.configuration.areas.clone(),
            include_essay,
            essay_theme: input.essay.as_ref().map(|e| e.theme.clone()),
            time_spent_secs: input.time_spent_secs,
            objective,
            essay,
            feedback,
            total_score,
            max_score,
        }
    }
}

impl GradingResult {
    /// Save the result as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a result from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let result: GradingResult =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(result)
    }

    /// Flatten into the record handed to a downstream sink.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            session_id: self.session_id,
            areas: self
                .areas
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
            accuracy: self.objective.accuracy,
            estimated_score: self.objective.estimated_score,
            essay_score: self.essay.as_ref().map(|e| e.total),
            total_score: self.total_score,
            time_spent_secs: self.time_spent_secs,
            completed_at: self.completed_at,
        }
    }
}

/// Flat summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    /// Comma-separated area identifiers.
    pub areas: String,
    pub accuracy: f64,
    pub estimated_score: u32,
    pub essay_score: Option<u32>,
    pub total_score: u32,
    pub time_spent_secs: u64,
    pub completed_at: DateTime<Utc>,
}
