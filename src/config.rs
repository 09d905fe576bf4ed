//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::{
    blocking::SubdomainPolicy,
    error::Result,
    state::{PhaseDurations, StartRequest},
};

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "focus-guard")]
#[command(about = "A focus timer that blocks distracting sites while you work")]
#[command(version)]
pub struct Config {
    #[command(subcommand)]
    pub mode: Mode,

    /// Directory holding the timer snapshot and the published rule file
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Mode {
    /// Run the timer authority daemon
    Serve(ServeArgs),
    /// Show the current timer state
    Status {
        /// Keep re-querying once per second
        #[arg(short, long)]
        follow: bool,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Start a work phase
    Start {
        /// Run a single session of this many seconds with no break phase
        #[arg(long)]
        duration_seconds: Option<u64>,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Stop the timer and reset it to the full duration
    Stop {
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Switch between work and break immediately (debugging aid)
    Switch {
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Report the current phase as finished
    Complete {
        #[command(flatten)]
        client: ClientArgs,
    },
}

/// Daemon options
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Default work phase length in minutes
    #[arg(long, default_value = "25")]
    pub work_minutes: u64,

    /// Default break phase length in minutes; 0 disables the break phase
    #[arg(long, default_value = "5")]
    pub break_minutes: u64,

    /// File with one blocked domain per line (defaults to the built-in list)
    #[arg(long)]
    pub blocklist: Option<PathBuf>,

    /// Which subdomains of a blocked domain are blocked
    #[arg(long, value_enum, default_value_t = SubdomainPolicy::Any)]
    pub subdomains: SubdomainPolicy,

    /// Redirect blocked navigations to this daemon's block page instead of failing them
    #[arg(long)]
    pub redirect: bool,

    /// Keep the snapshot and rules in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Log notifications instead of showing desktop notifications
    #[arg(long)]
    pub no_desktop_notifications: bool,
}

impl ServeArgs {
    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn defaults(&self) -> Result<PhaseDurations> {
        PhaseDurations::cyclic(self.work_minutes, Some(self.break_minutes))
    }

    /// Target for redirect rules
    pub fn block_page_url(&self) -> String {
        format!("http://{}/blocked", self.address())
    }
}

/// Control surface options
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Base URL of the timer authority
    #[arg(long, default_value = "http://127.0.0.1:20554")]
    pub authority: String,

    /// Work phase length in minutes
    #[arg(long, default_value = "25")]
    pub work_minutes: u64,

    /// Break phase length in minutes; 0 disables the break phase
    #[arg(long, default_value = "5")]
    pub break_minutes: u64,
}

impl ClientArgs {
    pub fn defaults(&self) -> Result<PhaseDurations> {
        PhaseDurations::cyclic(self.work_minutes, Some(self.break_minutes))
    }

    pub fn start_request(&self, duration_seconds: Option<u64>) -> StartRequest {
        match duration_seconds {
            Some(duration_seconds) => StartRequest::Session { duration_seconds },
            None => StartRequest::Cycle {
                work_duration_minutes: self.work_minutes,
                break_duration_minutes: Some(self.break_minutes),
            },
        }
    }
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// `--state-dir`, else `$XDG_STATE_HOME/focus-guard`, else `~/.local/state/focus-guard`
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        let base = std::env::var_os("XDG_STATE_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("focus-guard")
    }
}
