//! Control surface: an ephemeral view that always re-derives timer state

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::link::{AuthorityLink, Command};
use crate::{
    error::Result,
    state::{format_clock, Clock, PhaseDurations, SnapshotStore, StartRequest, TimerState},
};

/// Where a view's state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSource {
    Authority,
    Snapshot,
    Defaults,
}

impl ViewSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewSource::Authority => "authority",
            ViewSource::Snapshot => "snapshot",
            ViewSource::Defaults => "defaults",
        }
    }
}

/// Rendering projection of the timer.
///
/// Remaining time is always computed from the anchored snapshot, never from a
/// counter kept by the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub source: ViewSource,
    pub anchor: TimerState,
}

impl View {
    pub fn is_running(&self) -> bool {
        self.anchor.is_running
    }

    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        self.anchor.live_remaining(now)
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let clock = format_clock(self.remaining_at(now));
        if self.is_running() {
            format!("{} {}", self.anchor.phase.as_str(), clock)
        } else {
            format!("idle {}", clock)
        }
    }
}

/// Reconciles with the authority on every open and forwards user commands
pub struct ControlSurface<L> {
    link: L,
    snapshot: Box<dyn SnapshotStore>,
    defaults: PhaseDurations,
    clock: Arc<dyn Clock>,
}

impl<L: AuthorityLink> ControlSurface<L> {
    pub fn new(link: L, snapshot: Box<dyn SnapshotStore>, defaults: PhaseDurations, clock: Arc<dyn Clock>) -> Self {
        Self { link, snapshot, defaults, clock }
    }

    /// Current state: the authority first, then the persisted snapshot, then defaults
    pub async fn open(&self) -> View {
        match self.link.query_state().await {
            Ok(state) if state.is_running => {
                return View { source: ViewSource::Authority, anchor: state };
            }
            Ok(_) => debug!("Authority reports idle, checking snapshot"),
            Err(e) => debug!("Authority unreachable, checking snapshot: {}", e),
        }

        let now = self.clock.now();
        match self.snapshot.load() {
            Ok(Some(state)) if state.is_running && state.live_remaining(now) > 0 => {
                return View { source: ViewSource::Snapshot, anchor: state };
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read timer snapshot: {}", e),
        }

        View {
            source: ViewSource::Defaults,
            anchor: TimerState::idle(self.defaults, now),
        }
    }

    pub async fn start(&self, request: StartRequest) -> Result<()> {
        self.link.send(Command::Start(request)).await
    }

    /// Idle immediately; the next start begins from the full duration
    pub async fn stop(&self) -> Result<()> {
        self.link.send(Command::Stop).await
    }

    /// Debug command flipping between work and break
    pub async fn switch_phase(&self) -> Result<()> {
        self.link.send(Command::Switch).await
    }

    pub async fn report_phase_complete(&self) -> Result<()> {
        self.link.send(Command::PhaseComplete).await
    }
}
