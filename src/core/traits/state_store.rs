use crate::core::errors::Result;
use crate::core::models::state::DeploymentState;

/// Port for persisting per-environment deployment state.
///
/// v0.4 only ships with `FileStateStore`; the trait enables future
/// remote backends (object storage, a locking service, etc.).
pub trait StateStore: Send + Sync {
    /// Load the state for an environment, or a fresh empty state if
    /// none has been recorded yet.
    fn load(&self, environment: &str) -> Result<DeploymentState>;

    /// Persist the state for an environment, replacing any previous
    /// snapshot atomically.
    fn save(&self, state: &DeploymentState) -> Result<()>;

    /// Environments with recorded state.
    fn environments(&self) -> Result<Vec<String>>;
}
