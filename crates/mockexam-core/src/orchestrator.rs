//! The session state machine.
//!
//! `ExamOrchestrator` never performs I/O. Work that needs the external
//! services is split into a `begin_*` step that hands out a ticket and a
//! `complete_*` step that applies the outcome. Tickets carry the session id,
//! so an outcome for a session that was reset in the meantime is discarded.
//!
//! ```text
//! Selection -> Generating -> InProgress -> (Essay) -> Grading -> Result
//!     ^            |                                    |
//!     +-- failure -+              InProgress <- failure +
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{ClockEvent, ExamClock};
use crate::error::ExamError;
use crate::grading::GradingInput;
use crate::ledger::{Cursor, ResponseLedger};
use crate::model::{
    EssaySubmission, ExamConfiguration, ExamSettings, Item, OptionKey, ESSAY_THEMES,
};
use crate::report::GradingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Selection,
    Generating,
    InProgress,
    Essay,
    Grading,
    Result,
}

impl Phase {
    /// Phases in which the clock counts down.
    pub fn is_timed(&self) -> bool {
        matches!(self, Phase::InProgress | Phase::Essay)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Selection => "selection",
            Phase::Generating => "generating",
            Phase::InProgress => "in-progress",
            Phase::Essay => "essay",
            Phase::Grading => "grading",
            Phase::Result => "result",
        };
        f.write_str(name)
    }
}

/// Everything created at session start and discarded on reset.
#[derive(Debug, Clone)]
pub struct ExamSession {
    pub id: Uuid,
    pub configuration: ExamConfiguration,
    pub items: Vec<Item>,
    pub ledger: ResponseLedger,
    pub cursor: Cursor,
    pub essay: Option<EssaySubmission>,
    pub clock: ExamClock,
    pub started_at: DateTime<Utc>,
}

impl ExamSession {
    pub fn current_item(&self) -> Option<&Item> {
        self.items.get(self.cursor.current() as usize - 1)
    }

    fn snapshot(&self) -> GradingInput {
        GradingInput {
            session_id: self.id,
            configuration: self.configuration.clone(),
            items: self.items.clone(),
            ledger: self.ledger.clone(),
            essay: self.essay.clone(),
            started_at: self.started_at,
            time_spent_secs: self.clock.elapsed_seconds(),
        }
    }
}

/// Handed out by [`ExamOrchestrator::begin_start`]; redeem with `complete_start`.
#[derive(Debug, Clone)]
pub struct StartTicket {
    pub session_id: Uuid,
    pub configuration: ExamConfiguration,
    /// Session-scoped seed for the generation service.
    pub seed: String,
}

/// Handed out when a session is finalized; redeem with `complete_finalize`.
#[derive(Debug, Clone)]
pub struct GradingTicket {
    pub input: GradingInput,
    /// Finalize was forced by clock expiry.
    pub forced: bool,
}

pub struct ExamOrchestrator {
    settings: ExamSettings,
    phase: Phase,
    pending: Option<StartTicket>,
    session: Option<ExamSession>,
    result: Option<GradingResult>,
    last_error: Option<String>,
}

impl ExamOrchestrator {
    pub fn new(settings: ExamSettings) -> Self {
        Self {
            settings,
            phase: Phase::Selection,
            pending: None,
            session: None,
            result: None,
            last_error: None,
        }
    }

    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&ExamSession> {
        self.session.as_ref()
    }

    pub fn result(&self) -> Option<&GradingResult> {
        self.result.as_ref()
    }

    /// The message of the last surfaced failure, cleared by the next successful transition.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Id of the live (or generating) session.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session
            .as_ref()
            .map(|s| s.id)
            .or_else(|| self.pending.as_ref().map(|p| p.session_id))
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!(from = %self.phase, to = %phase, "phase transition");
            self.phase = phase;
        }
    }

    fn session_mut(&mut self, operation: &'static str) -> Result<&mut ExamSession, ExamError> {
        let phase = self.phase;
        self.session
            .as_mut()
            .ok_or_else(|| ExamError::invalid_phase(operation, phase))
    }

    fn require(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), ExamError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ExamError::invalid_phase(operation, self.phase))
        }
    }

    fn require_time_left(&self, operation: &'static str) -> Result<(), ExamError> {
        if self.session.as_ref().is_some_and(|s| s.clock.has_expired()) {
            return Err(ExamError::TimeUp { operation });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    /// Validate the configuration and enter `Generating`.
    ///
    /// A rejected configuration leaves the session in `Selection` without any
    /// network call.
    pub fn begin_start(&mut self, configuration: ExamConfiguration) -> Result<StartTicket, ExamError> {
        self.require("start", &[Phase::Selection])?;
        if let Err(e) = configuration.validate() {
            self.last_error = Some(e.to_string());
            return Err(e);
        }

        let mut configuration = configuration;
        if configuration.include_essay && configuration.essay_theme.is_none() {
            configuration.essay_theme = ESSAY_THEMES
                .choose(&mut rand::rng())
                .map(|t| t.to_string());
        }

        let session_id = Uuid::new_v4();
        let ticket = StartTicket {
            session_id,
            seed: session_id.simple().to_string(),
            configuration,
        };
        self.pending = Some(ticket.clone());
        self.last_error = None;
        self.set_phase(Phase::Generating);
        Ok(ticket)
    }

    /// Apply the outcome of item generation.
    pub fn complete_start(
        &mut self,
        session_id: Uuid,
        outcome: Result<Vec<Item>, ExamError>,
    ) -> Result<(), ExamError> {
        let matches = self.phase == Phase::Generating
            && self.pending.as_ref().is_some_and(|p| p.session_id == session_id);
        if !matches {
            tracing::warn!(%session_id, "discarding generation outcome for a superseded session");
            return Err(ExamError::StaleSession);
        }
        let Some(ticket) = self.pending.take() else {
            return Err(ExamError::StaleSession);
        };

        let items = match outcome.and_then(|items| {
            let expected = ticket.configuration.item_count();
            if items.len() == expected {
                Ok(items)
            } else {
                Err(ExamError::MalformedPayload(format!(
                    "expected {expected} items, got {}",
                    items.len()
                )))
            }
        }) {
            Ok(items) => items,
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.set_phase(Phase::Selection);
                return Err(e);
            }
        };

        let mut clock = ExamClock::new(self.settings.total_seconds(&ticket.configuration));
        clock.start();
        let essay = ticket
            .configuration
            .essay_theme
            .as_ref()
            .filter(|_| ticket.configuration.include_essay)
            .map(EssaySubmission::new);

        tracing::info!(
            %session_id,
            items = items.len(),
            seconds = clock.total_seconds(),
            "session started"
        );
        self.session = Some(ExamSession {
            id: session_id,
            ledger: ResponseLedger::new(items.len()),
            cursor: Cursor::new(items.len()),
            configuration: ticket.configuration,
            items,
            essay,
            clock,
            started_at: Utc::now(),
        });
        self.set_phase(Phase::InProgress);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Answering and navigation
    // -----------------------------------------------------------------------

    pub fn answer(&mut self, number: u32, option: OptionKey) -> Result<(), ExamError> {
        self.require("answer", &[Phase::InProgress])?;
        self.require_time_left("answer")?;
        self.session_mut("answer")?.ledger.set(number, option)
    }

    pub fn clear_answer(&mut self, number: u32) -> Result<(), ExamError> {
        self.require("clear an answer", &[Phase::InProgress])?;
        self.require_time_left("clear an answer")?;
        self.session_mut("clear an answer")?.ledger.clear(number)
    }

    pub fn go_to(&mut self, number: u32) -> Result<u32, ExamError> {
        self.require("navigate", &[Phase::InProgress])?;
        self.session_mut("navigate")?.cursor.go_to(number)
    }

    pub fn next(&mut self) -> Result<u32, ExamError> {
        self.require("navigate", &[Phase::InProgress])?;
        Ok(self.session_mut("navigate")?.cursor.next())
    }

    pub fn previous(&mut self) -> Result<u32, ExamError> {
        self.require("navigate", &[Phase::InProgress])?;
        Ok(self.session_mut("navigate")?.cursor.previous())
    }

    pub fn proceed_to_essay(&mut self) -> Result<(), ExamError> {
        self.require("open the essay", &[Phase::InProgress])?;
        if !self.session_mut("open the essay")?.configuration.include_essay {
            return Err(ExamError::EssayNotIncluded);
        }
        self.set_phase(Phase::Essay);
        Ok(())
    }

    /// Replace the essay text. Editable until finalize.
    pub fn write_essay(&mut self, text: impl Into<String>) -> Result<(), ExamError> {
        self.require("write the essay", &[Phase::Essay])?;
        self.require_time_left("write the essay")?;
        let session = self.session_mut("write the essay")?;
        match session.essay.as_mut() {
            Some(essay) => {
                essay.text = text.into();
                Ok(())
            }
            None => Err(ExamError::EssayNotIncluded),
        }
    }

    // -----------------------------------------------------------------------
    // Clock and finalize
    // -----------------------------------------------------------------------

    /// Advance the clock by one second. Returns a grading ticket on the tick
    /// that exhausts the allotment, and again on every later tick while an
    /// expired session is back in a timed phase after a failed grading.
    pub fn tick(&mut self) -> Option<GradingTicket> {
        if !self.phase.is_timed() {
            return None;
        }
        let clock = &mut self.session.as_mut()?.clock;
        if clock.has_expired() {
            tracing::info!("time is up, retrying finalize");
            return self.enter_grading(true);
        }
        let event = clock.tick();
        match event {
            ClockEvent::Expired => {
                tracing::info!("time is up, finalizing");
                self.enter_grading(true)
            }
            ClockEvent::Ticked { .. } | ClockEvent::Idle => None,
        }
    }

    /// Enter `Grading`. Returns `Ok(None)` when grading already started or
    /// finished, so repeated calls never grade twice.
    pub fn begin_finalize(&mut self) -> Result<Option<GradingTicket>, ExamError> {
        match self.phase {
            Phase::InProgress | Phase::Essay => Ok(self.enter_grading(false)),
            Phase::Grading | Phase::Result => Ok(None),
            phase => Err(ExamError::invalid_phase("finalize", phase)),
        }
    }

    fn enter_grading(&mut self, forced: bool) -> Option<GradingTicket> {
        let session = self.session.as_mut()?;
        session.clock.stop();
        let input = session.snapshot();
        self.set_phase(Phase::Grading);
        Some(GradingTicket { input, forced })
    }

    /// Apply the grading outcome. A failure reverts to `InProgress` with the
    /// ledger untouched so finalize can be retried.
    pub fn complete_finalize(
        &mut self,
        session_id: Uuid,
        outcome: Result<GradingResult, ExamError>,
    ) -> Result<&GradingResult, ExamError> {
        let matches = self.phase == Phase::Grading
            && self.session.as_ref().is_some_and(|s| s.id == session_id);
        if !matches {
            tracing::warn!(%session_id, "discarding grading outcome for a superseded session");
            return Err(ExamError::StaleSession);
        }

        match outcome {
            Ok(result) => {
                self.last_error = None;
                self.set_phase(Phase::Result);
                Ok(self.result.insert(result))
            }
            Err(e) => {
                tracing::error!("grading failed, returning to the items: {e}");
                self.last_error = Some(e.to_string());
                if let Some(session) = self.session.as_mut() {
                    session.clock.start();
                }
                self.set_phase(Phase::InProgress);
                Err(e)
            }
        }
    }

    /// Discard the session and return to `Selection`.
    pub fn reset(&mut self) {
        if let Some(id) = self.session_id() {
            tracing::info!(session_id = %id, "session discarded");
        }
        self.pending = None;
        self.session = None;
        self.result = None;
        self.last_error = None;
        self.set_phase(Phase::Selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentArea, ITEMS_PER_AREA};
    use crate::testing::generated_batch;

    fn items_for(configuration: &ExamConfiguration) -> Vec<Item> {
        configuration
            .areas
            .iter()
            .enumerate()
            .flat_map(|(batch, area)| {
                generated_batch(*area, ITEMS_PER_AREA, "seed")
                    .into_iter()
                    .enumerate()
                    .map(move |(i, g)| g.into_item((batch * ITEMS_PER_AREA + i + 1) as u32, *area))
            })
            .collect()
    }

    fn settings() -> ExamSettings {
        ExamSettings {
            seconds_per_item: 1,
            essay_bonus_secs: 5,
            ..ExamSettings::default()
        }
    }

    fn started(configuration: ExamConfiguration) -> ExamOrchestrator {
        let mut exam = ExamOrchestrator::new(settings());
        let ticket = exam.begin_start(configuration).unwrap();
        let items = items_for(&ticket.configuration);
        exam.complete_start(ticket.session_id, Ok(items)).unwrap();
        exam
    }

    fn dummy_result(input: &GradingInput) -> GradingResult {
        let objective = crate::scoring::grade_objective(&input.items, &input.ledger).unwrap();
        crate::report::ResultAggregator::aggregate(input, objective, None, None)
    }

    #[test]
    fn empty_configuration_stays_in_selection() {
        let mut exam = ExamOrchestrator::new(settings());
        let err = exam.begin_start(ExamConfiguration::new(vec![])).unwrap_err();
        assert!(matches!(err, ExamError::Configuration(_)));
        assert_eq!(exam.phase(), Phase::Selection);
        assert!(exam.last_error().is_some());
    }

    #[test]
    fn generation_failure_returns_to_selection() {
        let mut exam = ExamOrchestrator::new(settings());
        let ticket = exam
            .begin_start(ExamConfiguration::new(vec![ContentArea::Languages]))
            .unwrap();
        assert_eq!(exam.phase(), Phase::Generating);

        let err = exam
            .complete_start(
                ticket.session_id,
                Err(ExamError::Generation {
                    area: ContentArea::Languages,
                    source: anyhow::anyhow!("boom"),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, ExamError::Generation { .. }));
        assert_eq!(exam.phase(), Phase::Selection);
        assert!(exam.session().is_none());

        // retry is allowed
        assert!(exam
            .begin_start(ExamConfiguration::new(vec![ContentArea::Languages]))
            .is_ok());
    }

    #[test]
    fn wrong_item_count_is_a_generation_failure() {
        let mut exam = ExamOrchestrator::new(settings());
        let configuration = ExamConfiguration::new(vec![ContentArea::Languages, ContentArea::Mathematics]);
        let ticket = exam.begin_start(configuration.clone()).unwrap();
        let mut items = items_for(&configuration);
        items.truncate(15);

        assert!(exam.complete_start(ticket.session_id, Ok(items)).is_err());
        assert_eq!(exam.phase(), Phase::Selection);
    }

    #[test]
    fn start_enters_in_progress_with_running_clock() {
        let exam = started(ExamConfiguration::new(vec![ContentArea::Languages]).with_essay());
        assert_eq!(exam.phase(), Phase::InProgress);

        let session = exam.session().unwrap();
        assert_eq!(session.items.len(), 10);
        assert!(session.clock.is_running());
        assert_eq!(session.clock.total_seconds(), 10 + 5);
        let theme = session.essay.as_ref().unwrap().theme.as_str();
        assert!(ESSAY_THEMES.contains(&theme));
        assert_eq!(session.configuration.essay_theme.as_deref(), Some(theme));
    }

    #[test]
    fn stale_generation_outcome_is_discarded() {
        let mut exam = ExamOrchestrator::new(settings());
        let configuration = ExamConfiguration::new(vec![ContentArea::Languages]);
        let old = exam.begin_start(configuration.clone()).unwrap();
        exam.reset();
        let new = exam.begin_start(configuration.clone()).unwrap();

        let err = exam
            .complete_start(old.session_id, Ok(items_for(&configuration)))
            .unwrap_err();
        assert!(matches!(err, ExamError::StaleSession));
        assert_eq!(exam.phase(), Phase::Generating);

        exam.complete_start(new.session_id, Ok(items_for(&configuration)))
            .unwrap();
        assert_eq!(exam.session().unwrap().id, new.session_id);
    }

    #[test]
    fn answer_only_in_progress() {
        let mut exam = ExamOrchestrator::new(settings());
        assert!(matches!(
            exam.answer(1, OptionKey::A),
            Err(ExamError::InvalidPhase { .. })
        ));

        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]).with_essay());
        exam.answer(1, OptionKey::A).unwrap();
        exam.answer(1, OptionKey::C).unwrap();
        exam.clear_answer(1).unwrap();
        exam.answer(2, OptionKey::B).unwrap();
        assert!(matches!(
            exam.answer(11, OptionKey::B),
            Err(ExamError::UnknownItem(11))
        ));

        exam.proceed_to_essay().unwrap();
        assert!(exam.answer(3, OptionKey::A).is_err());
        let ledger = &exam.session().unwrap().ledger;
        assert_eq!(ledger.get(1), None);
        assert_eq!(ledger.get(2), Some(OptionKey::B));
    }

    #[test]
    fn answering_does_not_touch_the_clock() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]));
        exam.tick();
        exam.answer(5, OptionKey::D).unwrap();
        exam.next().unwrap();
        assert_eq!(exam.session().unwrap().clock.remaining_seconds(), 9);
    }

    #[test]
    fn navigation() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]));
        assert_eq!(exam.previous().unwrap(), 1);
        assert_eq!(exam.next().unwrap(), 2);
        assert_eq!(exam.go_to(10).unwrap(), 10);
        assert_eq!(exam.next().unwrap(), 10);
        assert!(exam.go_to(0).is_err());
        assert_eq!(exam.session().unwrap().current_item().unwrap().number, 10);
    }

    #[test]
    fn essay_requires_include_essay() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]));
        assert!(matches!(
            exam.proceed_to_essay(),
            Err(ExamError::EssayNotIncluded)
        ));
        assert!(exam.write_essay("text").is_err());
        assert_eq!(exam.phase(), Phase::InProgress);
    }

    #[test]
    fn essay_text_is_editable_in_essay_phase() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]).with_theme("Water"));
        exam.proceed_to_essay().unwrap();
        exam.write_essay("first draft").unwrap();
        exam.write_essay("second draft").unwrap();

        let ticket = exam.begin_finalize().unwrap().unwrap();
        let essay = ticket.input.essay.unwrap();
        assert_eq!(essay.theme, "Water");
        assert_eq!(essay.text, "second draft");
    }

    #[test]
    fn expiry_forces_finalize_exactly_once() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]));
        let mut tickets = Vec::new();
        for _ in 0..15 {
            tickets.extend(exam.tick());
        }
        assert_eq!(tickets.len(), 1);
        assert!(tickets[0].forced);
        assert_eq!(tickets[0].input.time_spent_secs, 10);
        assert_eq!(exam.phase(), Phase::Grading);

        // finalize after expiry does not produce a second ticket
        assert!(exam.begin_finalize().unwrap().is_none());
    }

    #[test]
    fn failed_grading_after_expiry_is_retried_on_next_tick() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]));
        exam.answer(2, OptionKey::C).unwrap();
        let ticket = (0..10).find_map(|_| exam.tick()).unwrap();
        assert!(ticket.forced);

        exam.complete_finalize(
            ticket.input.session_id,
            Err(ExamError::Scoring(crate::error::ScoringError::EmptyExam)),
        )
        .unwrap_err();
        assert_eq!(exam.phase(), Phase::InProgress);
        assert!(exam.session().unwrap().clock.has_expired());

        // the ledger is frozen once time is up
        assert!(matches!(
            exam.answer(3, OptionKey::A),
            Err(ExamError::TimeUp { .. })
        ));
        assert!(matches!(
            exam.clear_answer(2),
            Err(ExamError::TimeUp { .. })
        ));
        assert!(exam.go_to(5).is_ok());

        let retry = exam.tick().unwrap();
        assert!(retry.forced);
        assert_eq!(exam.phase(), Phase::Grading);
        assert_eq!(retry.input.ledger.get(2), Some(OptionKey::C));
        assert_eq!(retry.input.ledger.answered_count(), 1);
        assert_eq!(retry.input.time_spent_secs, 10);
        assert!(exam.tick().is_none());

        let result = dummy_result(&retry.input);
        exam.complete_finalize(retry.input.session_id, Ok(result))
            .unwrap();
        assert_eq!(exam.phase(), Phase::Result);
    }

    #[test]
    fn essay_is_frozen_after_expiry() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]).with_essay());
        exam.proceed_to_essay().unwrap();
        let ticket = (0..15).find_map(|_| exam.tick()).unwrap();
        exam.complete_finalize(
            ticket.input.session_id,
            Err(ExamError::Scoring(crate::error::ScoringError::EmptyExam)),
        )
        .unwrap_err();

        exam.proceed_to_essay().unwrap();
        assert!(matches!(
            exam.write_essay("late edit"),
            Err(ExamError::TimeUp { .. })
        ));
    }

    #[test]
    fn clock_only_runs_in_timed_phases() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]));
        let ticket = exam.begin_finalize().unwrap().unwrap();
        let before = exam.session().unwrap().clock.remaining_seconds();
        assert!(exam.tick().is_none());
        assert_eq!(exam.session().unwrap().clock.remaining_seconds(), before);

        let result = dummy_result(&ticket.input);
        exam.complete_finalize(ticket.input.session_id, Ok(result))
            .unwrap();
        assert_eq!(exam.phase(), Phase::Result);
        assert!(exam.tick().is_none());
        assert!(exam.begin_finalize().unwrap().is_none());
    }

    #[test]
    fn grading_failure_reverts_to_in_progress() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]).with_essay());
        exam.answer(3, OptionKey::A).unwrap();
        exam.proceed_to_essay().unwrap();
        let ticket = exam.begin_finalize().unwrap().unwrap();

        let err = exam
            .complete_finalize(
                ticket.input.session_id,
                Err(ExamError::Scoring(crate::error::ScoringError::EmptyExam)),
            )
            .unwrap_err();
        assert!(matches!(err, ExamError::Scoring(_)));
        assert_eq!(exam.phase(), Phase::InProgress);
        let session = exam.session().unwrap();
        assert_eq!(session.ledger.get(3), Some(OptionKey::A));
        assert!(session.clock.is_running());

        // retry succeeds
        let ticket = exam.begin_finalize().unwrap().unwrap();
        let result = dummy_result(&ticket.input);
        assert!(exam
            .complete_finalize(ticket.input.session_id, Ok(result))
            .is_ok());
    }

    #[test]
    fn result_is_terminal_until_reset() {
        let mut exam = started(ExamConfiguration::new(vec![ContentArea::Languages]));
        let ticket = exam.begin_finalize().unwrap().unwrap();
        let result = dummy_result(&ticket.input);
        exam.complete_finalize(ticket.input.session_id, Ok(result))
            .unwrap();

        assert!(exam
            .begin_start(ExamConfiguration::new(vec![ContentArea::Languages]))
            .is_err());
        assert!(exam.answer(1, OptionKey::A).is_err());

        exam.reset();
        assert_eq!(exam.phase(), Phase::Selection);
        assert!(exam.result().is_none());
        assert!(exam.session().is_none());
    }

    #[test]
    fn finalize_before_start_is_rejected() {
        let mut exam = ExamOrchestrator::new(settings());
        assert!(matches!(
            exam.begin_finalize(),
            Err(ExamError::InvalidPhase { .. })
        ));
    }
}
