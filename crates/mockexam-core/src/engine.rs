//! Async driver around the session state machine.
//!
//! The engine owns the orchestrator behind a mutex and performs the service
//! calls with the lock released, so answering and navigation stay responsive
//! while items are generated or the session is graded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::builder::{QuestionSetBuilder, RetryPolicy};
use crate::error::ExamError;
use crate::grading::{EssayGradingAdapter, FeedbackAdapter, GradingPipeline};
use crate::model::{ExamConfiguration, ExamSettings, OptionKey};
use crate::orchestrator::{ExamOrchestrator, ExamSession, GradingTicket, Phase};
use crate::report::GradingResult;
use crate::traits::{EssayGrader, FeedbackSynthesizer, ItemSource, SessionSink};

/// The three external services a session needs.
#[derive(Clone)]
pub struct ExamServices {
    pub items: Arc<dyn ItemSource>,
    pub essays: Arc<dyn EssayGrader>,
    pub feedback: Arc<dyn FeedbackSynthesizer>,
}

/// Presentation hooks. Called after the state lock is released.
pub trait SessionObserver: Send + Sync {
    fn on_phase_change(&self, _phase: Phase) {}
    fn on_tick(&self, _remaining_seconds: u64) {}
    fn on_result(&self, _result: &GradingResult) {}
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

#[derive(Clone)]
pub struct ExamEngine {
    state: Arc<Mutex<ExamOrchestrator>>,
    builder: Arc<QuestionSetBuilder>,
    pipeline: Arc<GradingPipeline>,
    observer: Arc<dyn SessionObserver>,
    sink: Option<Arc<dyn SessionSink>>,
}

impl ExamEngine {
    pub fn new(services: ExamServices, settings: ExamSettings, retry: RetryPolicy) -> Self {
        let builder = QuestionSetBuilder::new(services.items)
            .with_parallelism(settings.generation_parallelism)
            .with_retry(retry);
        let pipeline = GradingPipeline::new(
            EssayGradingAdapter::new(services.essays, settings.min_essay_chars),
            FeedbackAdapter::new(services.feedback),
        );
        Self {
            state: Arc::new(Mutex::new(ExamOrchestrator::new(settings))),
            builder: Arc::new(builder),
            pipeline: Arc::new(pipeline),
            observer: Arc::new(NoopObserver),
            sink: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Hand every finished session to `sink`. Sink failures are logged only.
    pub fn with_sink(mut self, sink: Arc<dyn SessionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run `f` under the lock and notify the observer if the phase moved.
    async fn transition<T>(&self, f: impl FnOnce(&mut ExamOrchestrator) -> T) -> T {
        let (out, before, after) = {
            let mut state = self.state.lock().await;
            let before = state.phase();
            let out = f(&mut *state);
            (out, before, state.phase())
        };
        if before != after {
            self.observer.on_phase_change(after);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Generate the items and open the session.
    pub async fn start(&self, configuration: ExamConfiguration) -> Result<(), ExamError> {
        let ticket = self.transition(|s| s.begin_start(configuration)).await?;
        tracing::info!(
            session_id = %ticket.session_id,
            areas = ticket.configuration.areas.len(),
            essay = ticket.configuration.include_essay,
            "generating items"
        );

        let outcome = self
            .builder
            .build(&ticket.configuration.areas, &ticket.seed)
            .await;
        self.transition(|s| s.complete_start(ticket.session_id, outcome))
            .await
    }

    pub async fn answer(&self, number: u32, option: OptionKey) -> Result<(), ExamError> {
        self.state.lock().await.answer(number, option)
    }

    pub async fn clear_answer(&self, number: u32) -> Result<(), ExamError> {
        self.state.lock().await.clear_answer(number)
    }

    pub async fn go_to(&self, number: u32) -> Result<u32, ExamError> {
        self.state.lock().await.go_to(number)
    }

    pub async fn next(&self) -> Result<u32, ExamError> {
        self.state.lock().await.next()
    }

    pub async fn previous(&self) -> Result<u32, ExamError> {
        self.state.lock().await.previous()
    }

    pub async fn proceed_to_essay(&self) -> Result<(), ExamError> {
        self.transition(|s| s.proceed_to_essay()).await
    }

    pub async fn write_essay(&self, text: impl Into<String>) -> Result<(), ExamError> {
        self.state.lock().await.write_essay(text)
    }

    /// Grade the session. Returns `Ok(None)` when grading was already
    /// started by an earlier call or by clock expiry.
    pub async fn finalize(&self) -> Result<Option<GradingResult>, ExamError> {
        match self.transition(|s| s.begin_finalize()).await? {
            Some(ticket) => self.grade(ticket).await.map(Some),
            None => Ok(None),
        }
    }

    /// Advance the clock by one second, grading the session if time ran out.
    pub async fn tick(&self) -> Option<Result<GradingResult, ExamError>> {
        let (ticket, remaining) = self
            .transition(|s| {
                let before = s.session().map(|x| x.clock.remaining_seconds());
                let ticket = s.tick();
                let after = s.session().map(|x| x.clock.remaining_seconds());
                (ticket, after.filter(|a| Some(*a) != before))
            })
            .await;

        if let Some(remaining) = remaining {
            self.observer.on_tick(remaining);
        }
        match ticket {
            Some(ticket) => Some(self.grade(ticket).await),
            None => None,
        }
    }

    async fn grade(&self, ticket: GradingTicket) -> Result<GradingResult, ExamError> {
        let session_id = ticket.input.session_id;
        tracing::info!(%session_id, forced = ticket.forced, "grading session");

        let outcome = self.pipeline.run(&ticket.input).await;
        let result = self
            .transition(|s| s.complete_finalize(session_id, outcome).cloned())
            .await?;

        self.observer.on_result(&result);
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(&result.to_record()).await {
                tracing::warn!(%session_id, "failed to record session: {e:#}");
            }
        }
        Ok(result)
    }

    /// Discard the session. Outcomes still in flight for it will be ignored.
    pub async fn reset(&self) {
        self.transition(|s| s.reset()).await
    }

    /// Drive the clock at one tick per second until the returned handle is dropped.
    pub fn spawn_clock(&self) -> ClockTask {
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Some(Err(e)) = engine.tick().await {
                    tracing::error!("grading after time-up failed: {e}");
                }
            }
        });
        ClockTask { handle }
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }

    pub async fn session(&self) -> Option<ExamSession> {
        self.state.lock().await.session().cloned()
    }

    pub async fn result(&self) -> Option<GradingResult> {
        self.state.lock().await.result().cloned()
    }

    pub async fn remaining_seconds(&self) -> Option<u64> {
        self.state
            .lock()
            .await
            .session()
            .map(|s| s.clock.remaining_seconds())
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error().map(str::to_string)
    }
}

/// Background clock; aborted on drop.
pub struct ClockTask {
    handle: JoinHandle<()>,
}

impl ClockTask {
    /// Stop ticking. Dropping the task has the same effect.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for ClockTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
