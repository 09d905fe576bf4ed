//! Assembles the timer authority from daemon options

use std::{path::Path, sync::Arc};
use anyhow::Context;
use tracing::info;

use crate::{
    blocking::{BlockedDomainList, FileRuleEngine, MemoryRuleEngine, RuleAction, RuleEngine, RuleSync},
    config::ServeArgs,
    services::{DesktopNotifier, LogNotifier, NoticeScope, Notifier},
    state::{Authority, AuthorityParts, JsonFileStore, MemoryStore, SnapshotStore, SystemClock},
};

/// Build the authority and reconcile it with whatever the last process left behind
pub fn build_authority(args: &ServeArgs, state_dir: &Path) -> anyhow::Result<Authority> {
    let defaults = args.defaults().context("invalid default durations")?;

    let domains = match &args.blocklist {
        Some(path) => BlockedDomainList::from_file(path, args.subdomains)
            .with_context(|| format!("failed to read blocklist {}", path.display()))?,
        None => BlockedDomainList::defaults(args.subdomains),
    };
    info!("Blocking {} domains during work phases", domains.len());

    let action = if args.redirect {
        RuleAction::Redirect { url: args.block_page_url() }
    } else {
        RuleAction::Block
    };

    let (store, engine): (Box<dyn SnapshotStore>, Box<dyn RuleEngine>) = if args.ephemeral {
        info!("Ephemeral mode, timer state will not survive a restart");
        (Box::new(MemoryStore::new()), Box::new(MemoryRuleEngine::new()))
    } else {
        let store = JsonFileStore::in_dir(state_dir);
        let engine = FileRuleEngine::in_dir(state_dir);
        info!("Snapshot at {}, rules at {}", store.path().display(), engine.path().display());
        (Box::new(store), Box::new(engine))
    };

    let notifier: Box<dyn Notifier> = if args.no_desktop_notifications {
        Box::new(LogNotifier::new())
    } else {
        Box::new(DesktopNotifier::new())
    };

    Ok(Authority::restore(AuthorityParts {
        store,
        rules: RuleSync::new(engine, domains, action),
        notices: NoticeScope::new(notifier),
        clock: Arc::new(SystemClock),
        defaults,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crate::config::{Config, Mode};

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["focus-guard", "serve", "--no-desktop-notifications"];
        argv.extend_from_slice(extra);
        match Config::try_parse_from(argv).unwrap().mode {
            Mode::Serve(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn file_backed_authority_resumes_across_rebuilds() {
        let dir = tempfile::tempdir().expect("temp dir");
        let args = serve_args(&["--redirect"]);

        let mut authority = build_authority(&args, dir.path()).unwrap();
        authority.start(&crate::state::StartRequest::Session { duration_seconds: 600 }).unwrap();
        let installed = authority.rules().installed().unwrap();
        assert_eq!(installed.len(), crate::blocking::DEFAULT_BLOCKED_DOMAINS.len());
        assert!(matches!(installed[0].action, RuleAction::Redirect { .. }));
        drop(authority);

        let rebuilt = build_authority(&args, dir.path()).unwrap();
        assert!(rebuilt.state().is_running);
        assert!(rebuilt.blocking_active());
    }

    #[test]
    fn custom_blocklist_is_used() {
        let dir = tempfile::tempdir().expect("temp dir");
        let list = dir.path().join("blocklist.txt");
        std::fs::write(&list, "example.org\n").unwrap();
        let args = serve_args(&["--ephemeral", "--blocklist", list.to_str().unwrap()]);

        let authority = build_authority(&args, dir.path()).unwrap();
        assert_eq!(authority.rules().domains().domains(), &["example.org".to_string()]);
    }

    #[test]
    fn missing_blocklist_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let args = serve_args(&["--ephemeral", "--blocklist", "/nonexistent/list.txt"]);
        assert!(build_authority(&args, dir.path()).is_err());
    }
}
