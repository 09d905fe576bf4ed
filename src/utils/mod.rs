//! Utility functions module
//! 
//! This module contains utility functions used throughout the application.

pub mod fs;
pub mod signals;

// Re-export main functions
pub use fs::atomic_write;
pub use signals::shutdown_signal;
