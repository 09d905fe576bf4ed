//! Declarative blocking rules and their synchronization with the timer phase

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domains::{host_matches, normalize_host, BlockedDomainList, SubdomainPolicy};
use crate::{
    error::{GuardError, Result},
    utils::atomic_write,
};

pub type RuleId = u32;

/// Id slots reserved per domain: bare domain, then `www.`
pub const RULES_PER_DOMAIN: u32 = 2;

/// Dynamic rule limit of the enforcing engine
pub const DEFAULT_RULE_QUOTA: usize = 5000;

/// File name of the rule list written by [`FileRuleEngine`]
pub const RULES_FILE: &str = "blocking_rules.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    Block,
    Redirect { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub host: String,
    pub include_subdomains: bool,
    pub resource_types: Vec<ResourceType>,
}

impl RuleCondition {
    pub fn matches(&self, host: &str, resource: ResourceType) -> bool {
        if !self.resource_types.contains(&resource) {
            return false;
        }
        let host = normalize_host(host);
        if self.include_subdomains {
            host_matches(&host, &self.host, SubdomainPolicy::Any)
        } else {
            // www. gets its own rule
            host == self.host
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub id: RuleId,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

/// One combined change: removals and additions land together or not at all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleUpdate {
    pub add: Vec<BlockRule>,
    pub remove_ids: Vec<RuleId>,
}

/// Engine that enforces installed rules at the network layer
pub trait RuleEngine: Send {
    /// Apply `update` atomically
    fn update(&mut self, update: RuleUpdate) -> Result<()>;

    /// Rules currently installed, ordered by id
    fn installed(&self) -> Result<Vec<BlockRule>>;
}

/// Compute the rule list after `update`, leaving `current` untouched on error
fn apply_update(current: &[BlockRule], update: RuleUpdate, quota: usize) -> Result<Vec<BlockRule>> {
    let mut next: Vec<BlockRule> = current
        .iter()
        .filter(|rule| !update.remove_ids.contains(&rule.id))
        .filter(|rule| !update.add.iter().any(|added| added.id == rule.id))
        .cloned()
        .collect();
    next.extend(update.add);

    if next.len() > quota {
        return Err(GuardError::RuleQuota { requested: next.len(), limit: quota });
    }

    next.sort_by_key(|rule| rule.id);
    Ok(next)
}

/// Whether any rule in `rules` blocks a navigation to `host`
pub fn rules_block(rules: &[BlockRule], host: &str, resource: ResourceType) -> bool {
    rules.iter().any(|rule| rule.condition.matches(host, resource))
}

/// In-process engine; clones share the installed set
#[derive(Debug, Clone)]
pub struct MemoryRuleEngine {
    rules: Arc<Mutex<Vec<BlockRule>>>,
    quota: Arc<Mutex<usize>>,
}

impl MemoryRuleEngine {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_RULE_QUOTA)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            quota: Arc::new(Mutex::new(quota)),
        }
    }

    pub fn set_quota(&self, quota: usize) {
        if let Ok(mut current) = self.quota.lock() {
            *current = quota;
        }
    }
}

impl Default for MemoryRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine for MemoryRuleEngine {
    fn update(&mut self, update: RuleUpdate) -> Result<()> {
        let quota = *self.quota.lock().map_err(|_| GuardError::LockPoisoned("rule quota"))?;
        let mut rules = self.rules.lock().map_err(|_| GuardError::LockPoisoned("rule set"))?;
        *rules = apply_update(&rules, update, quota)?;
        Ok(())
    }

    fn installed(&self) -> Result<Vec<BlockRule>> {
        self.rules
            .lock()
            .map(|rules| rules.clone())
            .map_err(|_| GuardError::LockPoisoned("rule set"))
    }
}

/// Engine that publishes the complete rule list as a JSON file for an
/// external enforcer (browser extension, proxy) to pick up
#[derive(Debug, Clone)]
pub struct FileRuleEngine {
    path: PathBuf,
    quota: usize,
}

impl FileRuleEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), quota: DEFAULT_RULE_QUOTA }
    }

    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(RULES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleEngine for FileRuleEngine {
    fn update(&mut self, update: RuleUpdate) -> Result<()> {
        let current = self.installed()?;
        let next = apply_update(&current, update, self.quota)?;
        atomic_write(&self.path, &serde_json::to_vec_pretty(&next)?)?;
        Ok(())
    }

    fn installed(&self) -> Result<Vec<BlockRule>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the engine's rule set equal to "blocking phase is active"
pub struct RuleSync {
    engine: Box<dyn RuleEngine>,
    domains: BlockedDomainList,
    action: RuleAction,
    tracked: Vec<RuleId>,
}

impl RuleSync {
    pub fn new(engine: Box<dyn RuleEngine>, domains: BlockedDomainList, action: RuleAction) -> Self {
        Self {
            engine,
            domains,
            action,
            tracked: Vec::new(),
        }
    }

    pub fn domains(&self) -> &BlockedDomainList {
        &self.domains
    }

    /// Ids installed by the last successful synchronization
    pub fn tracked(&self) -> &[RuleId] {
        &self.tracked
    }

    /// Every id the domain list can produce, installed or not
    pub fn all_rule_ids(&self) -> Vec<RuleId> {
        let slots = self.domains.len() as u32 * RULES_PER_DOMAIN;
        (1..=slots).collect()
    }

    /// Full rule set for the domain list, main-frame navigations only
    pub fn build_rules(&self) -> Vec<BlockRule> {
        let mut rules = Vec::new();
        for (index, domain) in self.domains.domains().iter().enumerate() {
            let base = index as u32 * RULES_PER_DOMAIN;
            let hosts = match self.domains.policy() {
                SubdomainPolicy::Any => vec![(domain.clone(), true)],
                SubdomainPolicy::WwwOnly => vec![(domain.clone(), false), (format!("www.{domain}"), false)],
            };
            for (slot, (host, include_subdomains)) in hosts.into_iter().enumerate() {
                rules.push(BlockRule {
                    id: base + slot as u32 + 1,
                    priority: 1,
                    action: self.action.clone(),
                    condition: RuleCondition {
                        host,
                        include_subdomains,
                        resource_types: vec![ResourceType::MainFrame],
                    },
                });
            }
        }
        rules
    }

    /// Install the full rule set when `active`, remove everything otherwise.
    ///
    /// Removal always covers every deterministic id, so rules left behind by a
    /// previous process are cleared too. On error nothing changes.
    pub fn synchronize(&mut self, active: bool) -> Result<()> {
        let mut remove_ids = self.all_rule_ids();
        for id in &self.tracked {
            if !remove_ids.contains(id) {
                remove_ids.push(*id);
            }
        }

        let add = if active { self.build_rules() } else { Vec::new() };
        let installed: Vec<RuleId> = add.iter().map(|rule| rule.id).collect();

        self.engine.update(RuleUpdate { add, remove_ids })?;

        if active {
            info!("Blocking {} domains with {} rules", self.domains.len(), installed.len());
        } else if !self.tracked.is_empty() {
            info!("Blocking rules cleared");
        } else {
            debug!("Blocking rules already clear");
        }
        self.tracked = installed;
        Ok(())
    }

    pub fn installed(&self) -> Result<Vec<BlockRule>> {
        self.engine.installed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_with(engine: &MemoryRuleEngine, policy: SubdomainPolicy) -> RuleSync {
        RuleSync::new(
            Box::new(engine.clone()),
            BlockedDomainList::new(["facebook.com", "youtube.com"], policy),
            RuleAction::Block,
        )
    }

    #[test]
    fn installing_twice_is_the_same_as_once() {
        let engine = MemoryRuleEngine::new();
        let mut sync = sync_with(&engine, SubdomainPolicy::Any);

        sync.synchronize(true).unwrap();
        let once = engine.installed().unwrap();
        sync.synchronize(true).unwrap();
        let twice = engine.installed().unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(sync.tracked(), &[1, 3]);
    }

    #[test]
    fn deactivating_removes_every_rule() {
        let engine = MemoryRuleEngine::new();
        let mut sync = sync_with(&engine, SubdomainPolicy::WwwOnly);

        sync.synchronize(true).unwrap();
        assert_eq!(engine.installed().unwrap().len(), 4);

        sync.synchronize(false).unwrap();
        assert!(engine.installed().unwrap().is_empty());
        assert!(sync.tracked().is_empty());
    }

    #[test]
    fn stale_rules_from_a_previous_process_are_cleared() {
        let engine = MemoryRuleEngine::new();
        sync_with(&engine, SubdomainPolicy::Any).synchronize(true).unwrap();

        // Fresh sync knows nothing about what was installed before
        let mut restarted = sync_with(&engine, SubdomainPolicy::Any);
        restarted.synchronize(false).unwrap();

        assert!(engine.installed().unwrap().is_empty());
    }

    #[test]
    fn quota_failure_leaves_the_previous_set_in_place() {
        let engine = MemoryRuleEngine::with_quota(1);
        let mut sync = sync_with(&engine, SubdomainPolicy::Any);

        let err = sync.synchronize(true).unwrap_err();
        assert!(matches!(err, GuardError::RuleQuota { requested: 2, limit: 1 }));
        assert!(engine.installed().unwrap().is_empty());
        assert!(sync.tracked().is_empty());
    }

    #[test]
    fn installed_rules_block_only_in_scope_main_frames() {
        let engine = MemoryRuleEngine::new();
        let mut sync = sync_with(&engine, SubdomainPolicy::WwwOnly);
        sync.synchronize(true).unwrap();
        let rules = engine.installed().unwrap();

        assert!(rules_block(&rules, "www.youtube.com", ResourceType::MainFrame));
        assert!(rules_block(&rules, "youtube.com", ResourceType::MainFrame));
        assert!(!rules_block(&rules, "m.youtube.com", ResourceType::MainFrame));
        assert!(!rules_block(&rules, "notyoutube.com", ResourceType::MainFrame));
        assert!(!rules_block(&rules, "youtube.com", ResourceType::SubFrame));
    }

    #[test]
    fn file_engine_persists_the_complete_list() {
        let dir = tempfile::tempdir().expect("temp dir");
        let engine = FileRuleEngine::in_dir(dir.path());
        let mut sync = RuleSync::new(
            Box::new(engine.clone()),
            BlockedDomainList::new(["reddit.com"], SubdomainPolicy::Any),
            RuleAction::Redirect { url: "http://127.0.0.1:20554/blocked".to_string() },
        );

        sync.synchronize(true).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(engine.path()).unwrap()).unwrap();
        assert_eq!(written[0]["id"], 1);
        assert_eq!(written[0]["action"]["type"], "redirect");
        assert_eq!(written[0]["condition"]["host"], "reddit.com");
        assert_eq!(written[0]["condition"]["resourceTypes"][0], "main_frame");

        sync.synchronize(false).unwrap();
        assert!(engine.installed().unwrap().is_empty());
    }
}
