//! Live navigation check layered on top of the rule engine

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{block_page::BlockPage, domains::BlockedDomainList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    NavigationStart,
    HistoryStateUpdate,
}

/// A tab navigation observed by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub tab_id: u64,
    pub url: String,
    pub kind: NavigationKind,
    /// 0 is the top-level document
    #[serde(default)]
    pub frame_id: u64,
}

/// What the observer should do with the tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum NavigationVerdict {
    Allow,
    #[serde(rename_all = "camelCase")]
    Block { tab_id: u64, host: String, html: String },
}

/// Applies the same boundary-anchored matching as the rule engine
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    domains: BlockedDomainList,
}

impl NavigationGuard {
    pub fn new(domains: BlockedDomainList) -> Self {
        Self { domains }
    }

    /// Block page for the tab, or `None` to let the navigation through.
    ///
    /// Malformed URLs and non-web schemes are ignored; the rule engine is the
    /// authoritative blocker.
    pub fn inspect(&self, event: &NavigationEvent, blocking_active: bool, remaining_seconds: u64) -> Option<BlockPage> {
        if !blocking_active || event.frame_id != 0 {
            return None;
        }

        let url = match Url::parse(&event.url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Ignoring unparsable navigation URL {:?}: {}", event.url, e);
                return None;
            }
        };
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?;

        if self.domains.matches(host) {
            info!("Blocking {:?} navigation to {} in tab {}", event.kind, host, event.tab_id);
            Some(BlockPage::new(host, remaining_seconds))
        } else {
            None
        }
    }

    pub fn verdict(&self, event: &NavigationEvent, blocking_active: bool, remaining_seconds: u64) -> NavigationVerdict {
        match self.inspect(event, blocking_active, remaining_seconds) {
            Some(page) => NavigationVerdict::Block {
                tab_id: event.tab_id,
                html: page.render(),
                host: page.host,
            },
            None => NavigationVerdict::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::SubdomainPolicy;

    fn guard() -> NavigationGuard {
        NavigationGuard::new(BlockedDomainList::new(["facebook.com"], SubdomainPolicy::Any))
    }

    fn event(url: &str) -> NavigationEvent {
        NavigationEvent {
            tab_id: 7,
            url: url.to_string(),
            kind: NavigationKind::NavigationStart,
            frame_id: 0,
        }
    }

    #[test]
    fn blocks_matching_host_while_active() {
        let page = guard().inspect(&event("https://m.facebook.com/feed"), true, 90).unwrap();
        assert_eq!(page, BlockPage::new("m.facebook.com", 90));
    }

    #[test]
    fn never_blocks_when_blocking_is_inactive() {
        assert!(guard().inspect(&event("https://facebook.com/"), false, 90).is_none());
    }

    #[test]
    fn lookalike_hosts_pass() {
        assert!(guard().inspect(&event("https://notfacebook.com/"), true, 90).is_none());
    }

    #[test]
    fn malformed_and_non_web_urls_are_ignored() {
        assert!(guard().inspect(&event("not a url"), true, 90).is_none());
        assert!(guard().inspect(&event("chrome://extensions"), true, 90).is_none());
        assert!(guard().inspect(&event("about:blank"), true, 90).is_none());
    }

    #[test]
    fn sub_frames_are_left_to_the_rule_engine() {
        let mut frame = event("https://facebook.com/plugin");
        frame.frame_id = 3;
        assert!(guard().inspect(&frame, true, 90).is_none());
    }

    #[test]
    fn history_updates_are_checked_too() {
        let mut spa = event("https://www.facebook.com/watch");
        spa.kind = NavigationKind::HistoryStateUpdate;
        match guard().verdict(&spa, true, 61) {
            NavigationVerdict::Block { tab_id, host, html } => {
                assert_eq!(tab_id, 7);
                assert_eq!(host, "www.facebook.com");
                assert!(html.contains("01:01"));
            }
            NavigationVerdict::Allow => panic!("expected block"),
        }
    }
}
