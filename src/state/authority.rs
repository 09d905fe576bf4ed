//! Timer authority: sole owner and writer of the canonical timer state

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Clock, Phase, PhaseDurations, SnapshotStore, StartRequest, TimerState};
use crate::{
    blocking::RuleSync,
    error::Result,
    services::{Badge, Notice, NoticeScope},
};

/// Collaborators handed to the authority at startup
pub struct AuthorityParts {
    pub store: Box<dyn SnapshotStore>,
    pub rules: RuleSync,
    pub notices: NoticeScope,
    pub clock: Arc<dyn Clock>,
    /// Durations used when no snapshot exists yet
    pub defaults: PhaseDurations,
}

/// The timer state machine.
///
/// Every mutation persists the snapshot, re-derives the blocking rules and
/// refreshes the badge. Side-effect failures are logged and never stop the
/// countdown.
pub struct Authority {
    timer: TimerState,
    store: Box<dyn SnapshotStore>,
    rules: RuleSync,
    notices: NoticeScope,
    clock: Arc<dyn Clock>,
    badge: watch::Sender<Badge>,
}

impl Authority {
    /// Rebuild the authority from the persisted snapshot.
    ///
    /// A running timer resumes from wall-clock time; one whose phase ran out
    /// while the process was gone transitions immediately. Rules are always
    /// re-derived since they do not survive the host process.
    pub fn restore(parts: AuthorityParts) -> Self {
        let now = parts.clock.now();
        let snapshot = match parts.store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to read timer snapshot, starting idle: {}", e);
                None
            }
        };
        let timer = snapshot.unwrap_or_else(|| TimerState::idle(parts.defaults, now));
        let (badge, _) = watch::channel(Badge::for_state(&timer));

        let mut authority = Self {
            timer,
            store: parts.store,
            rules: parts.rules,
            notices: parts.notices,
            clock: parts.clock,
            badge,
        };

        if !authority.timer.is_running {
            info!("Starting idle");
            authority.sync_rules();
            authority.publish_badge();
        } else if authority.timer.live_remaining(now) > 0 {
            authority.timer = authority.timer.projected(now);
            info!(
                "Resuming {} phase with {}s remaining",
                authority.timer.phase.as_str(),
                authority.timer.remaining_seconds
            );
            authority.commit();
        } else {
            info!("{} phase expired while stopped, transitioning now", authority.timer.phase.as_str());
            authority.expire(now);
        }

        authority
    }

    /// Begin a work phase with the requested durations; ignored while running
    pub fn start(&mut self, request: &StartRequest) -> Result<TimerState> {
        let durations = request.durations()?;
        if self.timer.is_running {
            info!("Start ignored, timer already running");
            return Ok(self.state());
        }

        let now = self.clock.now();
        self.timer = TimerState {
            is_running: true,
            ..TimerState::idle(durations, now)
        };
        info!(
            "Timer started: work={}s break={:?}",
            durations.work_seconds, durations.break_seconds
        );
        self.commit();
        Ok(self.state())
    }

    /// Idle immediately with the full work duration restored
    pub fn stop(&mut self) -> TimerState {
        let now = self.clock.now();
        if self.timer.is_running {
            info!("Timer stopped");
        } else {
            debug!("Stop while idle");
        }
        self.timer = TimerState::idle(self.timer.durations(), now);
        self.commit();
        self.state()
    }

    /// End the current phase now, as if it had run out
    pub fn complete_phase(&mut self) -> TimerState {
        if !self.timer.is_running {
            debug!("Phase completion ignored while idle");
            return self.state();
        }
        let now = self.clock.now();
        self.expire(now);
        self.state()
    }

    /// Advance the countdown to the current wall-clock time.
    ///
    /// Called about once per second. The anchor only moves by whole seconds
    /// so a late or early tick never loses time. If the clock was set back, the
    /// anchor follows it and counting resumes from the next tick.
    pub fn tick(&mut self) -> TimerState {
        let now = self.clock.now();
        if self.timer.is_running {
            let elapsed = self.timer.elapsed_whole_seconds(now);
            if elapsed >= self.timer.remaining_seconds {
                self.expire(now);
            } else if elapsed > 0 || self.timer.anchored_after(now) {
                self.timer = self.timer.projected(now);
                self.persist();
                self.publish_badge();
            }
        }
        self.notices.sweep(now);
        self.timer.clone()
    }

    /// Live state without mutating anything
    pub fn state(&self) -> TimerState {
        self.timer.projected(self.clock.now())
    }

    pub fn blocking_active(&self) -> bool {
        self.timer.blocking_active()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.timer.live_remaining(self.clock.now())
    }

    pub fn rules(&self) -> &RuleSync {
        &self.rules
    }

    pub fn subscribe_badge(&self) -> watch::Receiver<Badge> {
        self.badge.subscribe()
    }

    /// Write a final snapshot before the host process exits
    pub fn shutdown(&mut self) {
        let now = self.clock.now();
        self.timer = self.timer.projected(now);
        self.persist();
        info!("Timer snapshot saved for shutdown");
    }

    fn expire(&mut self, now: chrono::DateTime<chrono::Utc>) {
        let durations = self.timer.durations();
        let entered = match (self.timer.phase, durations.break_seconds) {
            (Phase::Work, Some(_)) => Some(Phase::Break),
            (Phase::Work, None) => None,
            (Phase::Break, _) => Some(Phase::Work),
        };

        self.timer = match entered {
            Some(phase) => TimerState {
                phase,
                remaining_seconds: durations.for_phase(phase),
                last_persisted_at: now,
                ..self.timer.clone()
            },
            None => TimerState::idle(durations, now),
        };

        match entered {
            Some(phase) => info!("Phase complete, entering {} phase", phase.as_str()),
            None => info!("Session complete"),
        }
        self.notices.replace(Notice::for_transition(entered, durations), now);
        self.commit();
    }

    fn commit(&mut self) {
        self.sync_rules();
        self.persist();
        self.publish_badge();
    }

    fn sync_rules(&mut self) {
        if let Err(e) = self.rules.synchronize(self.timer.blocking_active()) {
            warn!("Failed to update blocking rules, timer continues: {}", e);
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.timer) {
            warn!("Failed to persist timer snapshot: {}", e);
        }
    }

    fn publish_badge(&self) {
        self.badge.send_replace(Badge::for_state(&self.timer));
    }
}
