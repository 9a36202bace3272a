//! Piecewise score curve and objective grading.
//!
//! Maps accuracy onto the 300–900 scale with linear interpolation between
//! fixed breakpoints. Everything here is pure so the exact numeric output can
//! be pinned in tests.

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::ledger::ResponseLedger;
use crate::model::{ContentArea, Item, OptionKey};

/// Lowest score the scale can report.
pub const MIN_SCORE: u32 = 300;
/// Highest score the objective part can report.
pub const MAX_SCORE: u32 = 900;
/// Share of unanswered items above which the abandon penalty applies.
pub const UNANSWERED_PENALTY_THRESHOLD: f64 = 0.30;
/// Multiplier applied when the threshold is exceeded.
pub const UNANSWERED_PENALTY_FACTOR: f64 = 0.9;

/// Raw curve value for an accuracy in `[0, 1]`, before penalty and clamping.
pub fn score_at(accuracy: f64) -> f64 {
    let a = accuracy;
    if a <= 0.0 {
        300.0
    } else if a <= 0.10 {
        300.0 + a * 400.0
    } else if a <= 0.30 {
        340.0 + (a - 0.10) * 600.0
    } else if a <= 0.50 {
        460.0 + (a - 0.30) * 700.0
    } else if a <= 0.70 {
        600.0 + (a - 0.50) * 650.0
    } else if a <= 0.85 {
        730.0 + (a - 0.70) * 600.0
    } else if a <= 0.95 {
        820.0 + (a - 0.85) * 700.0
    } else {
        890.0 + (a - 0.95) * 600.0
    }
}

/// Estimate the calibrated score.
///
/// Unanswered items are already counted as incorrect by `correct`; the
/// `unanswered` count only decides whether the abandon penalty applies.
pub fn estimate_score(total: usize, correct: usize, unanswered: usize) -> Result<u32, ScoringError> {
    if total == 0 {
        return Err(ScoringError::EmptyExam);
    }
    if correct + unanswered > total {
        return Err(ScoringError::InconsistentCounts {
            total,
            correct,
            unanswered,
        });
    }

    let accuracy = correct as f64 / total as f64;
    let mut score = score_at(accuracy);
    if unanswered as f64 > UNANSWERED_PENALTY_THRESHOLD * total as f64 {
        score *= UNANSWERED_PENALTY_FACTOR;
    }
    let clamped = score.clamp(MIN_SCORE as f64, MAX_SCORE as f64);
    Ok(clamped.round() as u32)
}

/// Outcome for a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCorrection {
    pub number: u32,
    pub area: ContentArea,
    pub competency_tag: String,
    /// `None` when the item was left unanswered.
    pub chosen: Option<OptionKey>,
    pub correct_option: OptionKey,
    pub is_correct: bool,
    pub explanation: String,
}

/// Correct count for one area batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub area: ContentArea,
    pub first_item: u32,
    pub last_item: u32,
    pub correct: usize,
    pub total: usize,
}

impl AreaBreakdown {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// The always-present objective section of a grading result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveResult {
    pub total_items: usize,
    pub correct_count: usize,
    /// Includes unanswered items.
    pub incorrect_count: usize,
    pub unanswered_count: usize,
    pub accuracy: f64,
    pub estimated_score: u32,
    pub corrections: Vec<ItemCorrection>,
    /// Distinct competency tags of incorrect or unanswered items, first-seen order.
    pub missed_competencies: Vec<String>,
    pub area_breakdown: Vec<AreaBreakdown>,
}

impl ObjectiveResult {
    /// The view of this result handed to the feedback service.
    pub fn summary(&self) -> ObjectiveSummary {
        ObjectiveSummary {
            accuracy: self.accuracy,
            estimated_score: self.estimated_score,
            missed_competencies: self.missed_competencies.clone(),
        }
    }
}

/// What the feedback service is told about the objective part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSummary {
    pub accuracy: f64,
    pub estimated_score: u32,
    pub missed_competencies: Vec<String>,
}

/// Grade every item against the ledger and run the score curve.
pub fn grade_objective(items: &[Item], ledger: &ResponseLedger) -> Result<ObjectiveResult, ScoringError> {
    let corrections: Vec<ItemCorrection> = items
        .iter()
        .map(|item| {
            let chosen = ledger.get(item.number);
            ItemCorrection {
                number: item.number,
                area: item.area,
                competency_tag: item.competency_tag.clone(),
                chosen,
                correct_option: item.correct_option,
                is_correct: chosen == Some(item.correct_option),
                explanation: item.explanation.clone(),
            }
        })
        .collect();

    let total_items = corrections.len();
    let correct_count = corrections.iter().filter(|c| c.is_correct).count();
    let unanswered_count = corrections.iter().filter(|c| c.chosen.is_none()).count();
    let estimated_score = estimate_score(total_items, correct_count, unanswered_count)?;

    let mut missed_competencies: Vec<String> = Vec::new();
    for c in corrections.iter().filter(|c| !c.is_correct) {
        if !missed_competencies.contains(&c.competency_tag) {
            missed_competencies.push(c.competency_tag.clone());
        }
    }

    Ok(ObjectiveResult {
        total_items,
        correct_count,
        incorrect_count: total_items - correct_count,
        unanswered_count,
        accuracy: correct_count as f64 / total_items as f64,
        estimated_score,
        area_breakdown: area_breakdown(&corrections),
        corrections,
        missed_competencies,
    })
}

/// Group consecutive corrections of the same area into batches.
fn area_breakdown(corrections: &[ItemCorrection]) -> Vec<AreaBreakdown> {
    let mut batches: Vec<AreaBreakdown> = Vec::new();
    for c in corrections {
        match batches.last_mut() {
            Some(batch)
                if batch.area == c.area && batch.total < crate::model::ITEMS_PER_AREA =>
            {
                batch.last_item = c.number;
                batch.total += 1;
                batch.correct += usize::from(c.is_correct);
            }
            _ => batches.push(AreaBreakdown {
                area: c.area,
                first_item: c.number,
                last_item: c.number,
                correct: usize::from(c.is_correct),
                total: 1,
            }),
        }
    }
    batches
}
