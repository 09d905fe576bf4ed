//! Focus Guard - a persistent focus timer that blocks distracting sites
//! 
//! The timer authority owns the single canonical timer record, persists it
//! after every change and keeps the blocking rules in step with the current
//! phase. Control surfaces come and go and always re-derive what they show
//! from the authority or its snapshot.

pub mod api;
pub mod blocking;
pub mod bootstrap;
pub mod config;
pub mod control;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{GuardError, Result};
pub use state::{AppState, Authority};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
