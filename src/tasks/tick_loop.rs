//! Countdown tick background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::state::AppState;

/// Tick cadence of the authority
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that advances the authority once per second.
///
/// Ticks are cheap no-ops for the countdown while idle but still expire open
/// notifications. Missed ticks (suspend, busy runtime) are skipped rather than
/// replayed since the authority catches up from wall-clock time. Each tick
/// writes the snapshot to disk, so it runs on the blocking pool.
pub async fn tick_loop_task(state: Arc<AppState>) {
    info!("Starting tick loop");

    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let ticking = Arc::clone(&state);
        match tokio::task::spawn_blocking(move || ticking.tick()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to tick timer: {}", e),
            Err(e) => error!("Tick task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::{
        blocking::{BlockedDomainList, MemoryRuleEngine, RuleAction, RuleSync, SubdomainPolicy},
        services::{LogNotifier, NoticeScope},
        state::{Authority, AuthorityParts, ManualClock, MemoryStore, PhaseDurations, SnapshotStore, StartRequest},
    };

    #[tokio::test]
    async fn loop_advances_and_persists_the_countdown() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryStore::new();
        let authority = Authority::restore(AuthorityParts {
            store: Box::new(store.clone()),
            rules: RuleSync::new(
                Box::new(MemoryRuleEngine::new()),
                BlockedDomainList::new(["youtube.com"], SubdomainPolicy::Any),
                RuleAction::Block,
            ),
            notices: NoticeScope::new(Box::new(LogNotifier::new())),
            clock: clock.clone(),
            defaults: PhaseDurations::default(),
        });
        let state = Arc::new(AppState::new(authority, "127.0.0.1".to_string(), 0));
        state
            .apply("start", |authority| authority.start(&StartRequest::Session { duration_seconds: 10 }))
            .unwrap()
            .unwrap();
        clock.advance_secs(4);

        let ticker = tokio::spawn(tick_loop_task(Arc::clone(&state)));

        // The first interval tick fires immediately
        let mut persisted = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            persisted = store.load().unwrap().map(|s| s.remaining_seconds);
            if persisted == Some(6) {
                break;
            }
        }
        ticker.abort();
        assert_eq!(persisted, Some(6));
    }
}
