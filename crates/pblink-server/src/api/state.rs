use pblink_core::LinkWorkflow;
use pblink_storage::Storage;
use std::sync::Arc;
use std::time::Duration;

pub struct ServerState {
    pub workflow: LinkWorkflow,
    pub storage: Storage,
    pub run_timeout: Duration,
    pub keep_sessions: usize,
    pub keep_runs: usize,
}

/// Application state shared across all API handlers
pub type AppState = Arc<ServerState>;
