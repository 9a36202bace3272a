//! In-crate fakes for the external services.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::model::{ContentArea, GeneratedItem, OptionKey, OptionSet, Stimulus, VisualAid};
use crate::report::SessionRecord;
use crate::scoring::ObjectiveSummary;
use crate::traits::{EssayGrade, EssayGrader, Feedback, FeedbackSynthesizer, ItemSource, SessionSink};

/// Items whose key is always `A`, tagged `<area>-<n % 3>`.
pub(crate) fn generated_batch(area: ContentArea, count: usize, seed: &str) -> Vec<GeneratedItem> {
    (0..count)
        .map(|i| {
            let options: BTreeMap<OptionKey, String> = OptionKey::ALL
                .iter()
                .map(|k| (*k, format!("{area} option {k}")))
                .collect();
            GeneratedItem {
                competency_tag: format!("{area}-{}", i % 3),
                stimulus: Stimulus {
                    text: format!("stimulus {i} ({seed})"),
                    attribution: "fixture".into(),
                },
                prompt: format!("{area} question {i}"),
                options: OptionSet::try_from(options).unwrap(),
                correct_option: OptionKey::A,
                explanation: format!("{area} explanation {i}"),
                visual_aid: VisualAid::None,
            }
        })
        .collect()
}

#[derive(Default)]
pub(crate) struct FakeItemSource {
    calls: AtomicU32,
    transient_failures: AtomicU32,
    permanent_failure: bool,
    fail_area: Option<ContentArea>,
    batch_size: Option<usize>,
    delays: HashMap<ContentArea, Duration>,
    seeds: Mutex<Vec<String>>,
    completed: Mutex<Vec<ContentArea>>,
}

impl FakeItemSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, area: ContentArea, delay: Duration) -> Self {
        self.delays.insert(area, delay);
        self
    }

    pub(crate) fn failing_for(mut self, area: ContentArea) -> Self {
        self.fail_area = Some(area);
        self
    }

    pub(crate) fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub(crate) fn with_transient_failures(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_permanent_failure(mut self) -> Self {
        self.permanent_failure = true;
        self
    }

    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seeds(&self) -> Vec<String> {
        self.seeds.lock().unwrap().clone()
    }

    pub(crate) fn completion_order(&self) -> Vec<ContentArea> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemSource for FakeItemSource {
    async fn generate(
        &self,
        area: ContentArea,
        count: usize,
        seed: &str,
    ) -> anyhow::Result<Vec<GeneratedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seeds.lock().unwrap().push(seed.to_string());

        if let Some(delay) = self.delays.get(&area) {
            tokio::time::sleep(*delay).await;
        }
        if self.permanent_failure {
            return Err(ProviderError::AuthenticationFailed("bad key".into()).into());
        }
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::NetworkError("connection reset".into()).into());
        }
        if self.fail_area == Some(area) {
            anyhow::bail!("generation service unavailable for {area}");
        }

        self.completed.lock().unwrap().push(area);
        Ok(generated_batch(area, self.batch_size.unwrap_or(count), seed))
    }
}

pub(crate) fn sample_grade() -> EssayGrade {
    EssayGrade {
        competencies: vec![160, 160, 120, 160, 80],
        total: 680,
        narrative: "Clear thesis, weak intervention proposal.".into(),
        strengths: vec!["formal register".into()],
        improvements: vec!["detail the intervention proposal".into()],
    }
}

/// Returns the scripted grade, or fails when none was scripted.
pub(crate) struct FakeEssayGrader {
    calls: AtomicU32,
    response: Option<EssayGrade>,
}

impl FakeEssayGrader {
    pub(crate) fn returning(grade: EssayGrade) -> Self {
        Self {
            calls: AtomicU32::new(0),
            response: Some(grade),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            calls: AtomicU32::new(0),
            response: None,
        }
    }

    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EssayGrader for FakeEssayGrader {
    async fn grade_essay(&self, _theme: &str, _text: &str) -> anyhow::Result<EssayGrade> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| ProviderError::Timeout(30).into())
    }
}

pub(crate) struct FakeFeedback {
    calls: AtomicU32,
    fail: bool,
    seen: Mutex<Vec<(ObjectiveSummary, Option<u32>)>>,
}

impl FakeFeedback {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<(ObjectiveSummary, Option<u32>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedbackSynthesizer for FakeFeedback {
    async fn synthesize_feedback(
        &self,
        summary: &ObjectiveSummary,
        essay_total: Option<u32>,
    ) -> anyhow::Result<Feedback> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((summary.clone(), essay_total));
        if self.fail {
            anyhow::bail!("feedback service unavailable");
        }
        Ok(Feedback {
            narrative: format!("You scored {}.", summary.estimated_score),
            weak_areas: summary.missed_competencies.clone(),
            study_tips: vec!["review one weak area per day".into()],
            next_goal: format!("reach {}", summary.estimated_score + 40),
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) records: Mutex<Vec<SessionRecord>>,
}

#[async_trait]
impl SessionSink for RecordingSink {
    async fn record(&self, record: &SessionRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
