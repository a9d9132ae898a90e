use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, StratusError};
use crate::core::models::state::DeploymentState;
use crate::core::traits::state_store::StateStore;

/// State store that keeps one pretty-printed JSON file per environment
/// under the state directory (`{env}.json`).
#[derive(Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given directory.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Return the directory this store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self, environment: &str) -> PathBuf {
        self.dir.join(format!("{environment}.json"))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, environment: &str) -> Result<DeploymentState> {
        let path = self.state_path(environment);
        if !path.exists() {
            return Ok(DeploymentState::new(environment));
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| StratusError::StateError {
            detail: format!("Malformed state file {}: {e}", path.display()),
        })
    }

    fn save(&self, state: &DeploymentState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let content =
            serde_json::to_string_pretty(state).map_err(|e| StratusError::StateError {
                detail: format!("Failed to serialize state: {e}"),
            })?;

        // stage then rename; readers never observe a partial file
        let path = self.state_path(&state.environment);
        let staged = path.with_extension("json.tmp");
        fs::write(&staged, content)?;
        fs::rename(&staged, &path)?;
        Ok(())
    }

    fn environments(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
