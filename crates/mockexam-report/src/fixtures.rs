use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use mockexam_core::grading::{EssayAssessment, GradingInput};
use mockexam_core::ledger::ResponseLedger;
use mockexam_core::model::{
    ContentArea, EssaySubmission, ExamConfiguration, Item, OptionKey, OptionSet, Stimulus,
    VisualAid, ESSAY_THEMES,
};
use mockexam_core::report::{GradingResult, ResultAggregator};
use mockexam_core::scoring::grade_objective;
use mockexam_core::traits::Feedback;

fn items(area: ContentArea) -> Vec<Item> {
    let options: BTreeMap<OptionKey, String> = OptionKey::ALL
        .iter()
        .map(|k| (*k, format!("option {k}")))
        .collect();
    let options = OptionSet::try_from(options).unwrap();

    (1..=10)
        .map(|n| Item {
            number: n,
            area,
            competency_tag: format!("H{n}"),
            stimulus: Stimulus {
                text: "A table shows rainfall over a year.".into(),
                attribution: String::new(),
            },
            prompt: format!("Question {n}"),
            options: options.clone(),
            correct_option: OptionKey::A,
            explanation: format!("Option A follows from row {n}."),
            visual_aid: VisualAid::None,
        })
        .collect()
}

fn input(configuration: ExamConfiguration, essay: Option<EssaySubmission>) -> GradingInput {
    let items = items(ContentArea::Mathematics);
    let mut ledger = ResponseLedger::new(items.len());
    for n in 1..=6 {
        ledger.set(n, OptionKey::A).unwrap();
    }
    GradingInput {
        session_id: Uuid::new_v4(),
        configuration,
        items,
        ledger,
        essay,
        started_at: Utc::now(),
        time_spent_secs: 1_234,
    }
}

/// Ten mathematics items, six correct and four unanswered.
pub fn sample_result() -> GradingResult {
    let input = input(ExamConfiguration::new(vec![ContentArea::Mathematics]), None);
    let objective = grade_objective(&input.items, &input.ledger).unwrap();
    ResultAggregator::aggregate(&input, objective, None, None)
}

pub fn with_essay_and_feedback() -> GradingResult {
    let mut essay = EssaySubmission::new(ESSAY_THEMES[0]);
    essay.text = "An essay long enough to be graded.".into();
    let configuration = ExamConfiguration::new(vec![ContentArea::Mathematics]).with_essay();
    let input = input(configuration, Some(essay));
    let objective = grade_objective(&input.items, &input.ledger).unwrap();

    let assessment = EssayAssessment {
        competencies: [160, 120, 160, 120, 120],
        total: 680,
        narrative: "Clear thesis, thin intervention proposal.".into(),
        strengths: vec!["Formal register".into()],
        improvements: vec!["Name the agent of the proposal".into()],
    };
    let feedback = Feedback {
        narrative: "Solid start in mathematics.".into(),
        weak_areas: vec!["Geometry".into()],
        study_tips: vec!["Review ratios".into()],
        next_goal: "Reach 700 in mathematics".into(),
    };
    ResultAggregator::aggregate(&input, objective, Some(assessment), Some(feedback))
}
