//! Phase completion notifications

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
    thread,
};
use chrono::{DateTime, Duration, Utc};
use notify_rust::{Notification, Timeout};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    error::{GuardError, Result},
    state::{Phase, PhaseDurations},
};

/// How long a notification stays up unless dismissed earlier
pub const NOTICE_LIFETIME_MS: u32 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(pub u32);

/// Content of a user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    /// Notice for a transition into `entered`, or `None` for the end of a single session
    pub fn for_transition(entered: Option<Phase>, durations: PhaseDurations) -> Self {
        match entered {
            Some(Phase::Break) => Self {
                title: "Focus time is over!".to_string(),
                message: format!(
                    "Good work! Enjoy a {}-minute break.",
                    minutes(durations.for_phase(Phase::Break))
                ),
            },
            Some(Phase::Work) => Self {
                title: "Break is over!".to_string(),
                message: format!(
                    "Time for {} minutes of focus.",
                    minutes(durations.work_seconds)
                ),
            },
            None => Self {
                title: "Focus session complete!".to_string(),
                message: "Well done. Blocked sites are available again.".to_string(),
            },
        }
    }
}

fn minutes(seconds: u64) -> u64 {
    seconds.div_ceil(60)
}

/// Shows and dismisses notifications
pub trait Notifier: Send {
    fn show(&self, notice: &Notice) -> Result<NoticeId>;
    fn dismiss(&self, id: NoticeId);
}

/// Work handed to the desktop notification thread
#[derive(Debug, Clone, PartialEq, Eq)]
enum DesktopRequest {
    Show(NoticeId, Notice),
    Dismiss(NoticeId),
}

/// Desktop notifications through the platform notification server.
///
/// Notification server calls block, so they run on a dedicated thread and
/// `show`/`dismiss` only queue requests for it.
pub struct DesktopNotifier {
    next_id: AtomicU32,
    requests: mpsc::UnboundedSender<DesktopRequest>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        let (requests, queue) = mpsc::unbounded_channel();
        let spawned = thread::Builder::new()
            .name("focus-guard-notify".to_string())
            .spawn(move || desktop_worker(queue));
        if let Err(e) = spawned {
            warn!("Failed to start notification thread: {}", e);
        }
        Self::with_queue(requests)
    }

    fn with_queue(requests: mpsc::UnboundedSender<DesktopRequest>) -> Self {
        Self { next_id: AtomicU32::new(0), requests }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for DesktopNotifier {
    fn show(&self, notice: &Notice) -> Result<NoticeId> {
        let id = NoticeId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.requests
            .send(DesktopRequest::Show(id, notice.clone()))
            .map_err(|_| GuardError::Notification("notification thread stopped".to_string()))?;
        Ok(id)
    }

    fn dismiss(&self, id: NoticeId) {
        if self.requests.send(DesktopRequest::Dismiss(id)).is_err() {
            debug!("Notification thread gone, {} left to its timeout", id.0);
        }
    }
}

fn desktop_worker(mut queue: mpsc::UnboundedReceiver<DesktopRequest>) {
    #[cfg(all(unix, not(target_os = "macos")))]
    let mut handles = std::collections::HashMap::new();

    while let Some(request) = queue.blocking_recv() {
        match request {
            DesktopRequest::Show(id, notice) => {
                let shown = Notification::new()
                    .summary(&notice.title)
                    .body(&notice.message)
                    .appname("focus-guard")
                    .icon("alarm-clock")
                    .timeout(Timeout::Milliseconds(NOTICE_LIFETIME_MS))
                    .show();
                match shown {
                    #[cfg(all(unix, not(target_os = "macos")))]
                    Ok(handle) => {
                        handles.insert(id, handle);
                    }
                    #[cfg(not(all(unix, not(target_os = "macos"))))]
                    Ok(_) => {}
                    Err(e) => warn!("Failed to show notification {}: {}", id.0, e),
                }
            }
            DesktopRequest::Dismiss(id) => {
                #[cfg(all(unix, not(target_os = "macos")))]
                {
                    if let Some(handle) = handles.remove(&id) {
                        handle.close();
                    }
                }
                // Other platforms rely on the native timeout
                debug!("Dismissed notification {}", id.0);
            }
        }
    }
    debug!("Notification thread stopped");
}

/// Lifecycle event recorded by [`LogNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    Shown(NoticeId, Notice),
    Dismissed(NoticeId),
}

/// Notifier for headless runs: logs and keeps a history
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    next_id: Arc<AtomicU32>,
    history: Arc<Mutex<Vec<NoticeEvent>>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<NoticeEvent> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Notices shown so far, oldest first
    pub fn shown(&self) -> Vec<Notice> {
        self.history()
            .into_iter()
            .filter_map(|event| match event {
                NoticeEvent::Shown(_, notice) => Some(notice),
                NoticeEvent::Dismissed(_) => None,
            })
            .collect()
    }

    /// Ids shown and not yet dismissed
    pub fn open(&self) -> Vec<NoticeId> {
        let mut open = Vec::new();
        for event in self.history() {
            match event {
                NoticeEvent::Shown(id, _) => open.push(id),
                NoticeEvent::Dismissed(id) => open.retain(|o| *o != id),
            }
        }
        open
    }

    fn record(&self, event: NoticeEvent) {
        if let Ok(mut history) = self.history.lock() {
            history.push(event);
        }
    }
}

impl Notifier for LogNotifier {
    fn show(&self, notice: &Notice) -> Result<NoticeId> {
        let id = NoticeId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        info!("Notification: {} - {}", notice.title, notice.message);
        self.record(NoticeEvent::Shown(id, notice.clone()));
        Ok(id)
    }

    fn dismiss(&self, id: NoticeId) {
        self.record(NoticeEvent::Dismissed(id));
    }
}

/// At most one open notification, dismissed after its lifetime or when the
/// next one replaces it, whichever comes first
pub struct NoticeScope {
    notifier: Box<dyn Notifier>,
    lifetime: Duration,
    active: Option<(NoticeId, DateTime<Utc>)>,
}

impl NoticeScope {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            notifier,
            lifetime: Duration::milliseconds(NOTICE_LIFETIME_MS as i64),
            active: None,
        }
    }

    pub fn replace(&mut self, notice: Notice, now: DateTime<Utc>) {
        self.dismiss_active();
        match self.notifier.show(&notice) {
            Ok(id) => self.active = Some((id, now + self.lifetime)),
            Err(e) => warn!("Failed to show notification: {}", e),
        }
    }

    /// Dismiss the open notification once its lifetime has passed
    pub fn sweep(&mut self, now: DateTime<Utc>) {
        if matches!(self.active, Some((_, expires_at)) if now >= expires_at) {
            self.dismiss_active();
        }
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    fn dismiss_active(&mut self) {
        if let Some((id, _)) = self.active.take() {
            self.notifier.dismiss(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_text_follows_the_entered_phase() {
        let durations = PhaseDurations::default();
        assert!(Notice::for_transition(Some(Phase::Break), durations).message.contains("5-minute"));
        assert!(Notice::for_transition(Some(Phase::Work), durations).message.contains("25 minutes"));
        assert_eq!(Notice::for_transition(None, durations).title, "Focus session complete!");
    }

    #[test]
    fn scope_dismisses_after_lifetime() {
        let log = LogNotifier::new();
        let mut scope = NoticeScope::new(Box::new(log.clone()));
        let now = Utc::now();

        scope.replace(Notice::for_transition(None, PhaseDurations::default()), now);
        scope.sweep(now + Duration::seconds(2));
        assert_eq!(log.open().len(), 1);

        scope.sweep(now + Duration::seconds(3));
        assert!(log.open().is_empty());
        assert!(!scope.has_active());
    }

    #[test]
    fn desktop_notifier_queues_work_for_its_thread() {
        let (requests, mut queue) = mpsc::unbounded_channel();
        let notifier = DesktopNotifier::with_queue(requests);
        let notice = Notice::for_transition(None, PhaseDurations::default());

        let first = notifier.show(&notice).unwrap();
        let second = notifier.show(&notice).unwrap();
        notifier.dismiss(first);

        assert_ne!(first, second);
        assert_eq!(queue.try_recv().unwrap(), DesktopRequest::Show(first, notice.clone()));
        assert_eq!(queue.try_recv().unwrap(), DesktopRequest::Show(second, notice));
        assert_eq!(queue.try_recv().unwrap(), DesktopRequest::Dismiss(first));
    }

    #[test]
    fn desktop_notifier_reports_a_stopped_thread() {
        let (requests, queue) = mpsc::unbounded_channel();
        drop(queue);
        let notifier = DesktopNotifier::with_queue(requests);

        let shown = notifier.show(&Notice::for_transition(None, PhaseDurations::default()));
        assert!(matches!(shown, Err(GuardError::Notification(_))));
        notifier.dismiss(NoticeId(1));
    }

    #[test]
    fn next_notice_dismisses_the_previous_one() {
        let log = LogNotifier::new();
        let mut scope = NoticeScope::new(Box::new(log.clone()));
        let now = Utc::now();
        let durations = PhaseDurations::default();

        scope.replace(Notice::for_transition(Some(Phase::Break), durations), now);
        scope.replace(Notice::for_transition(Some(Phase::Work), durations), now);

        assert_eq!(log.shown().len(), 2);
        assert_eq!(log.open(), vec![NoticeId(2)]);
        assert_eq!(log.history()[1], NoticeEvent::Dismissed(NoticeId(1)));
    }
}
