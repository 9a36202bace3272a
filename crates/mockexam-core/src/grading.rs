//! Essay grading and feedback adapters, and the grading pipeline.
//!
//! Both adapters are fail-soft: a transport error or a payload that breaks
//! the schema becomes `None`, never an error. The pipeline runs the score
//! curve, then the essay call, then feedback (which sees the essay total).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExamError;
use crate::ledger::ResponseLedger;
use crate::model::{EssaySubmission, ExamConfiguration, Item};
use crate::report::{GradingResult, ResultAggregator};
use crate::scoring::{grade_objective, ObjectiveSummary};
use crate::traits::{EssayGrade, EssayGrader, Feedback, FeedbackSynthesizer};

/// Number of essay competencies.
pub const ESSAY_COMPETENCIES: usize = 5;
/// Competency scores move in steps of this size.
pub const COMPETENCY_STEP: u32 = 40;
/// Highest score for one competency.
pub const MAX_COMPETENCY_SCORE: u32 = 200;
/// Highest essay total.
pub const MAX_ESSAY_SCORE: u32 = ESSAY_COMPETENCIES as u32 * MAX_COMPETENCY_SCORE;

/// A validated essay grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayAssessment {
    pub competencies: [u32; ESSAY_COMPETENCIES],
    /// Always the sum of `competencies`.
    pub total: u32,
    pub narrative: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

impl TryFrom<EssayGrade> for EssayAssessment {
    type Error = ExamError;

    fn try_from(grade: EssayGrade) -> Result<Self, Self::Error> {
        let competencies: [u32; ESSAY_COMPETENCIES] =
            grade.competencies.as_slice().try_into().map_err(|_| {
                ExamError::MalformedPayload(format!(
                    "expected {ESSAY_COMPETENCIES} competency scores, got {}",
                    grade.competencies.len()
                ))
            })?;

        if let Some((i, score)) = competencies
            .iter()
            .enumerate()
            .find(|(_, s)| **s > MAX_COMPETENCY_SCORE || **s % COMPETENCY_STEP != 0)
        {
            return Err(ExamError::MalformedPayload(format!(
                "competency {} score {score} is not a multiple of {COMPETENCY_STEP} in 0..={MAX_COMPETENCY_SCORE}",
                i + 1
            )));
        }

        let sum: u32 = competencies.iter().sum();
        if sum != grade.total {
            return Err(ExamError::MalformedPayload(format!(
                "essay total {} does not match competency sum {sum}",
                grade.total
            )));
        }

        Ok(EssayAssessment {
            competencies,
            total: sum,
            narrative: grade.narrative,
            strengths: grade.strengths,
            improvements: grade.improvements,
        })
    }
}

pub struct EssayGradingAdapter {
    grader: Arc<dyn EssayGrader>,
    min_chars: usize,
}

impl EssayGradingAdapter {
    pub fn new(grader: Arc<dyn EssayGrader>, min_chars: usize) -> Self {
        Self { grader, min_chars }
    }

    /// Whether the text is long enough to be sent for grading.
    pub fn is_gradable(&self, submission: &EssaySubmission) -> bool {
        submission.char_count() > self.min_chars
    }

    /// Grade the essay, or `None` if it is too short or the service misbehaves.
    pub async fn grade(&self, submission: &EssaySubmission) -> Option<EssayAssessment> {
        if !self.is_gradable(submission) {
            tracing::info!(
                chars = submission.char_count(),
                min = self.min_chars,
                "essay too short, skipping grading"
            );
            return None;
        }

        let grade = match self
            .grader
            .grade_essay(&submission.theme, submission.text.trim())
            .await
        {
            Ok(grade) => grade,
            Err(e) => {
                tracing::warn!("essay grading failed, continuing without essay: {e:#}");
                return None;
            }
        };

        match EssayAssessment::try_from(grade) {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                tracing::warn!("essay grade rejected: {e}");
                None
            }
        }
    }
}

pub struct FeedbackAdapter {
    synthesizer: Arc<dyn FeedbackSynthesizer>,
}

impl FeedbackAdapter {
    pub fn new(synthesizer: Arc<dyn FeedbackSynthesizer>) -> Self {
        Self { synthesizer }
    }

    pub async fn synthesize(
        &self,
        summary: &ObjectiveSummary,
        essay_total: Option<u32>,
    ) -> Option<Feedback> {
        match self.synthesizer.synthesize_feedback(summary, essay_total).await {
            Ok(feedback) if feedback.narrative.trim().is_empty() => {
                tracing::warn!("feedback rejected: empty narrative");
                None
            }
            Ok(feedback) => Some(feedback),
            Err(e) => {
                tracing::warn!("feedback synthesis failed: {e:#}");
                None
            }
        }
    }
}

/// Snapshot of a session taken at finalize. Grading never touches the live ledger.
#[derive(Debug, Clone)]
pub struct GradingInput {
    pub session_id: Uuid,
    pub configuration: ExamConfiguration,
    pub items: Vec<Item>,
    pub ledger: ResponseLedger,
    pub essay: Option<EssaySubmission>,
    pub started_at: DateTime<Utc>,
    pub time_spent_secs: u64,
}

pub struct GradingPipeline {
    essay: EssayGradingAdapter,
    feedback: FeedbackAdapter,
}

impl GradingPipeline {
    pub fn new(essay: EssayGradingAdapter, feedback: FeedbackAdapter) -> Self {
        Self { essay, feedback }
    }

    pub async fn run(&self, input: &GradingInput) -> Result<GradingResult, ExamError> {
        let objective = grade_objective(&input.items, &input.ledger)?;
        tracing::info!(
            correct = objective.correct_count,
            total = objective.total_items,
            score = objective.estimated_score,
            "objective part graded"
        );

        let essay = match (&input.essay, input.configuration.include_essay) {
            (Some(submission), true) => self.essay.grade(submission).await,
            _ => None,
        };

        let feedback = self
            .feedback
            .synthesize(&objective.summary(), essay.as_ref().map(|e| e.total))
            .await;

        Ok(ResultAggregator::aggregate(input, objective, essay, feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ESSAY_THEMES;
    use crate::testing::{sample_grade, FakeEssayGrader, FakeFeedback};

    fn essay(text: &str) -> EssaySubmission {
        EssaySubmission {
            theme: ESSAY_THEMES[2].into(),
            text: text.into(),
        }
    }

    #[test]
    fn assessment_accepts_valid_grade() {
        let assessment = EssayAssessment::try_from(sample_grade()).unwrap();
        assert_eq!(assessment.total, 680);
        assert_eq!(assessment.competencies, [160, 160, 120, 160, 80]);
    }

    #[test]
    fn assessment_rejects_wrong_count() {
        let mut grade = sample_grade();
        grade.competencies.pop();
        assert!(matches!(
            EssayAssessment::try_from(grade),
            Err(ExamError::MalformedPayload(_))
        ));
    }

    #[test]
    fn assessment_rejects_off_step_scores() {
        let mut grade = sample_grade();
        grade.competencies[0] = 150;
        grade.total = 670;
        let err = EssayAssessment::try_from(grade).unwrap_err();
        assert!(err.to_string().contains("competency 1 score 150"));

        let mut grade = sample_grade();
        grade.competencies[4] = 240;
        grade.total = 840;
        assert!(EssayAssessment::try_from(grade).is_err());
    }

    #[test]
    fn assessment_rejects_mismatched_total() {
        let mut grade = sample_grade();
        grade.total = 1000;
        let err = EssayAssessment::try_from(grade).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[tokio::test]
    async fn short_essay_is_not_sent() {
        let grader = Arc::new(FakeEssayGrader::returning(sample_grade()));
        let adapter = EssayGradingAdapter::new(grader.clone(), 20);

        assert!(adapter.grade(&essay("   too short   ")).await.is_none());
        assert_eq!(grader.call_count(), 0);
    }

    #[tokio::test]
    async fn essay_exactly_at_threshold_is_not_sent() {
        let grader = Arc::new(FakeEssayGrader::returning(sample_grade()));
        let adapter = EssayGradingAdapter::new(grader.clone(), 5);

        assert!(adapter.grade(&essay("12345")).await.is_none());
        assert!(adapter.grade(&essay("123456")).await.is_some());
        assert_eq!(grader.call_count(), 1);
    }

    #[tokio::test]
    async fn grader_failure_degrades_to_none() {
        let grader = Arc::new(FakeEssayGrader::failing());
        let adapter = EssayGradingAdapter::new(grader.clone(), 5);

        assert!(adapter.grade(&essay("long enough essay text")).await.is_none());
        assert_eq!(grader.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_grade_degrades_to_none() {
        let mut grade = sample_grade();
        grade.total = 999;
        let adapter = EssayGradingAdapter::new(Arc::new(FakeEssayGrader::returning(grade)), 5);

        assert!(adapter.grade(&essay("long enough essay text")).await.is_none());
    }

    #[tokio::test]
    async fn feedback_failure_degrades_to_none() {
        let adapter = FeedbackAdapter::new(Arc::new(FakeFeedback::failing()));
        let summary = ObjectiveSummary {
            accuracy: 0.5,
            estimated_score: 600,
            missed_competencies: vec![],
        };
        assert!(adapter.synthesize(&summary, None).await.is_none());
    }
}
