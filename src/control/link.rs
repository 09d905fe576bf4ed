//! Command channel from a control surface to the timer authority

use std::{sync::Arc, time::Duration};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    state::{AppState, StartRequest, TimerState},
};

/// Upper bound on a state query before falling back to the snapshot
pub const QUERY_TIMEOUT: Duration = Duration::from_millis(750);

/// Fire-and-forget commands accepted by the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Start(StartRequest),
    Stop,
    PhaseComplete,
    Switch,
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Stop => "stop",
            Command::PhaseComplete => "phase-complete",
            Command::Switch => "switch",
        }
    }
}

/// Request/response access to the authority
#[async_trait]
pub trait AuthorityLink: Send + Sync {
    /// Live timer state, answered within [`QUERY_TIMEOUT`]
    async fn query_state(&self) -> Result<TimerState>;

    async fn send(&self, command: Command) -> Result<()>;
}

/// Link to a daemon over its HTTP API
#[derive(Debug, Clone)]
pub struct HttpLink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLink {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthorityLink for HttpLink {
    async fn query_state(&self) -> Result<TimerState> {
        let state = self.client
            .get(self.url("state"))
            .send()
            .await?
            .error_for_status()?
            .json::<TimerState>()
            .await?;
        Ok(state)
    }

    async fn send(&self, command: Command) -> Result<()> {
        let request = self.client.post(self.url(command.action()));
        let request = match &command {
            Command::Start(start) => request.json(start),
            _ => request,
        };
        request.send().await?.error_for_status()?;
        debug!("Sent {} command", command.action());
        Ok(())
    }
}

/// Link to an authority living in the same process
#[derive(Clone)]
pub struct LocalLink {
    state: Arc<AppState>,
}

impl LocalLink {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl AuthorityLink for LocalLink {
    async fn query_state(&self) -> Result<TimerState> {
        self.state.read(|authority| authority.state())
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.state.apply(command.action(), |authority| match &command {
            Command::Start(request) => authority.start(request).map(|_| ()),
            Command::Stop => {
                authority.stop();
                Ok(())
            }
            Command::PhaseComplete | Command::Switch => {
                authority.complete_phase();
                Ok(())
            }
        })?
    }
}
