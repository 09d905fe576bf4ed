//! Side-effect services module
//! 
//! Notifications and the countdown status indicator driven by the authority.

pub mod badge;
pub mod notifier;

// Re-export main types
pub use badge::{Badge, Tint};
pub use notifier::{
    DesktopNotifier, LogNotifier, Notice, NoticeEvent, NoticeId, NoticeScope, Notifier,
};
