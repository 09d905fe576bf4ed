//! Blocked domain list and boundary-anchored host matching

use std::{fs, path::Path};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sites blocked when no list is configured
pub const DEFAULT_BLOCKED_DOMAINS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "snapchat.com",
    "linkedin.com",
    "youtube.com",
    "netflix.com",
    "twitch.tv",
    "niconico.jp",
    "reddit.com",
    "2ch.net",
    "5ch.net",
    "yahoo.co.jp",
    "amazon.co.jp",
    "amazon.com",
    "rakuten.co.jp",
    "mercari.com",
];

/// Which subdomains of a blocked domain are in scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SubdomainPolicy {
    /// The domain and every subdomain (`m.`, `www.`, ...)
    #[default]
    Any,
    /// Only the bare domain and its `www.` subdomain
    WwwOnly,
}

/// Lower-case a hostname and drop a trailing root dot
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Fixed, ordered set of domains. Positions determine rule ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedDomainList {
    domains: Vec<String>,
    policy: SubdomainPolicy,
}

impl BlockedDomainList {
    /// Build from raw entries; blanks and duplicates are dropped, order is kept
    pub fn new<I, S>(entries: I, policy: SubdomainPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut domains: Vec<String> = Vec::new();
        for entry in entries {
            let domain = normalize_host(entry.as_ref());
            let domain = domain.strip_prefix("www.").unwrap_or(&domain).to_string();
            if !domain.is_empty() && !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        Self { domains, policy }
    }

    pub fn defaults(policy: SubdomainPolicy) -> Self {
        Self::new(DEFAULT_BLOCKED_DOMAINS.iter().copied(), policy)
    }

    /// Read one domain per line; `#` starts a comment
    pub fn from_file(path: &Path, policy: SubdomainPolicy) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::parse(&raw, policy))
    }

    pub fn parse(raw: &str, policy: SubdomainPolicy) -> Self {
        let entries = raw
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|line| !line.is_empty());
        Self::new(entries, policy)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn policy(&self) -> SubdomainPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// The configured domain that `host` falls under, if any
    pub fn matching_domain(&self, host: &str) -> Option<&str> {
        let host = normalize_host(host);
        self.domains
            .iter()
            .find(|domain| host_matches(&host, domain, self.policy))
            .map(String::as_str)
    }

    pub fn matches(&self, host: &str) -> bool {
        self.matching_domain(host).is_some()
    }
}

/// Match anchored on label boundaries: `notfacebook.com` is not `facebook.com`
pub fn host_matches(host: &str, domain: &str, policy: SubdomainPolicy) -> bool {
    if host == domain {
        return true;
    }
    match policy {
        SubdomainPolicy::Any => host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.')),
        SubdomainPolicy::WwwOnly => host.strip_prefix("www.") == Some(domain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matching_is_anchored_on_domain_boundaries() {
        let list = BlockedDomainList::new(["facebook.com", "youtube.com"], SubdomainPolicy::Any);

        assert!(list.matches("facebook.com"));
        assert!(list.matches("www.facebook.com"));
        assert!(list.matches("m.facebook.com"));
        assert!(list.matches("WWW.FaceBook.com."));
        assert!(!list.matches("notfacebook.com"));
        assert!(!list.matches("notyoutube.com"));
        assert!(!list.matches("facebook.com.evil.net"));
    }

    #[test]
    fn www_only_policy_rejects_other_subdomains() {
        let list = BlockedDomainList::new(["facebook.com"], SubdomainPolicy::WwwOnly);

        assert!(list.matches("facebook.com"));
        assert!(list.matches("www.facebook.com"));
        assert!(!list.matches("m.facebook.com"));
        assert!(!list.matches("notfacebook.com"));
    }

    #[test]
    fn entries_are_normalized_and_deduplicated_in_order() {
        let list = BlockedDomainList::new(
            ["Reddit.com", "www.reddit.com", "", "x.com"],
            SubdomainPolicy::Any,
        );
        assert_eq!(list.domains(), &["reddit.com".to_string(), "x.com".to_string()]);
    }

    #[test]
    fn parses_lines_with_comments() {
        let list = BlockedDomainList::parse(
            "# distractions\nyoutube.com\n\n  twitch.tv  # streams\n",
            SubdomainPolicy::Any,
        );
        assert_eq!(list.domains(), &["youtube.com".to_string(), "twitch.tv".to_string()]);
    }

    #[test]
    fn default_list_is_kept_in_order() {
        let list = BlockedDomainList::defaults(SubdomainPolicy::Any);
        assert_eq!(list.len(), DEFAULT_BLOCKED_DOMAINS.len());
        assert_eq!(list.domains()[0], "facebook.com");
        assert_eq!(list.matching_domain("www.amazon.co.jp"), Some("amazon.co.jp"));
    }

    proptest! {
        #[test]
        fn a_glued_prefix_never_matches(prefix in "[a-z0-9]{1,12}") {
            let list = BlockedDomainList::defaults(SubdomainPolicy::Any);
            for domain in DEFAULT_BLOCKED_DOMAINS {
                let glued = format!("{prefix}{domain}");
                if list.domains().iter().any(|d| d == &glued) {
                    continue;
                }
                prop_assert_ne!(list.matching_domain(&glued), Some(*domain));
                let dotted = format!("{prefix}.{domain}");
                prop_assert!(list.matches(&dotted));
            }
        }
    }
}
