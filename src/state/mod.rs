//! State management module
//! 
//! This module contains the canonical timer record, its persistence, and the
//! authority that owns it.

pub mod app_state;
pub mod authority;
pub mod clock;
pub mod snapshot_store;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use authority::{Authority, AuthorityParts};
pub use clock::{Clock, ManualClock, SystemClock};
pub use snapshot_store::{JsonFileStore, MemoryStore, SnapshotStore};
pub use timer_state::{format_clock, Phase, PhaseDurations, StartRequest, TimerState};
