//! URL blocking module
//! 
//! Domain matching, the declarative rule set derived from it, and the
//! optional live navigation check.

pub mod block_page;
pub mod domains;
pub mod navigation;
pub mod rules;

pub use block_page::BlockPage;
pub use domains::{BlockedDomainList, SubdomainPolicy, DEFAULT_BLOCKED_DOMAINS};
pub use navigation::{NavigationEvent, NavigationGuard, NavigationKind, NavigationVerdict};
pub use rules::{
    BlockRule, FileRuleEngine, MemoryRuleEngine, ResourceType, RuleAction, RuleEngine, RuleSync,
    RuleUpdate,
};
