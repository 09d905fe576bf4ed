//! Shared daemon state

use std::{
    sync::{Mutex, MutexGuard},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::Authority;
use crate::{
    blocking::NavigationGuard,
    error::{GuardError, Result},
    services::Badge,
};

/// State shared by the HTTP handlers and the tick loop.
///
/// The authority sits behind one mutex, so commands, queries and ticks are
/// applied one at a time.
pub struct AppState {
    authority: Mutex<Authority>,
    /// Live navigation check using the authority's domain list
    pub navigation: NavigationGuard,
    /// Latest status indicator published by the authority
    pub badge_rx: watch::Receiver<Badge>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    pub fn new(authority: Authority, host: String, port: u16) -> Self {
        let navigation = NavigationGuard::new(authority.rules().domains().clone());
        let badge_rx = authority.subscribe_badge();

        Self {
            authority: Mutex::new(authority),
            navigation,
            badge_rx,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Authority>> {
        self.authority.lock().map_err(|_| GuardError::LockPoisoned("timer authority"))
    }

    /// Apply a command to the authority and record it as the last action
    pub fn apply<T>(&self, action: &str, command: impl FnOnce(&mut Authority) -> T) -> Result<T> {
        let mut authority = self.lock()?;
        let outcome = command(&mut authority);
        drop(authority);

        debug!("Applied {} command", action);
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some((action.to_string(), Utc::now()));
        }
        Ok(outcome)
    }

    /// Read from the authority without recording an action
    pub fn read<T>(&self, query: impl FnOnce(&Authority) -> T) -> Result<T> {
        let authority = self.lock()?;
        Ok(query(&authority))
    }

    /// Advance the countdown; used by the tick loop
    pub fn tick(&self) -> Result<()> {
        self.lock()?.tick();
        Ok(())
    }

    pub fn badge(&self) -> Badge {
        self.badge_rx.borrow().clone()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;
        
        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|a| a.clone()) {
            Some((action, at)) => (Some(action), Some(at)),
            None => (None, None),
        }
    }
}
