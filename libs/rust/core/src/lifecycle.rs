//! Service startup finite state machine.
//!
//! Phases:
//! - LoadingConfig
//! - LoadingRegistry
//! - Serving
//!
//! Tracks how long each phase took; readiness means the service reached `Serving`.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StartupPhase { LoadingConfig, LoadingRegistry, Serving }

#[derive(Debug)]
pub struct StartupState {
    phase: StartupPhase,
    started_at: Instant,
    phase_started_at: Instant,
    phase_durations: Vec<(StartupPhase, Duration)>,
}

impl Default for StartupState {
    fn default() -> Self { Self::new() }
}

impl StartupState {
    pub fn new() -> Self { Self { phase: StartupPhase::LoadingConfig, started_at: Instant::now(), phase_started_at: Instant::now(), phase_durations: Vec::new() } }
    pub fn phase(&self) -> StartupPhase { self.phase }
    pub fn advance(&mut self) {
        if self.phase == StartupPhase::Serving { return; }
        let now = Instant::now();
        self.phase_durations.push((self.phase, now - self.phase_started_at));
        self.phase = match self.phase { StartupPhase::LoadingConfig => StartupPhase::LoadingRegistry, StartupPhase::LoadingRegistry | StartupPhase::Serving => StartupPhase::Serving };
        self.phase_started_at = now;
        tracing::debug!(phase = ?self.phase, "startup phase advanced");
    }
    pub fn is_serving(&self) -> bool { self.phase == StartupPhase::Serving }
    pub fn durations(&self) -> &[(StartupPhase, Duration)] { &self.phase_durations }
    pub fn total(&self) -> Duration { self.started_at.elapsed() }
}
