use bridge::orchestrator::Orchestrator;
use std::path::PathBuf;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub service_name: String,
    pub workspace_root: PathBuf,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, service_name: String, workspace_root: PathBuf) -> Self {
        Self {
            orchestrator,
            service_name,
            workspace_root,
        }
    }
}
