//! Logical countdown clock.
//!
//! The clock knows nothing about wall time or rendering. Something else calls
//! [`ExamClock::tick`] once per second; the clock answers with what happened.
//! Expiry is reported exactly once per session.

use serde::{Deserialize, Serialize};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// The clock is stopped or already expired; nothing changed.
    Idle,
    /// One second elapsed.
    Ticked { remaining: u64 },
    /// The last second elapsed. Emitted once.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamClock {
    total_seconds: u64,
    remaining_seconds: u64,
    running: bool,
    expired: bool,
}

impl ExamClock {
    /// A stopped clock holding the full allotment.
    pub fn new(total_seconds: u64) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            running: false,
            expired: false,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.total_seconds - self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }

    /// Start or resume counting. A clock with no time left stays stopped.
    pub fn start(&mut self) {
        self.running = self.remaining_seconds > 0;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) -> ClockEvent {
        if !self.running || self.expired {
            return ClockEvent::Idle;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.running = false;
            self.expired = true;
            ClockEvent::Expired
        } else {
            ClockEvent::Ticked {
                remaining: self.remaining_seconds,
            }
        }
    }
}

/// Format seconds as `H:MM:SS`.
pub fn format_hms(seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
