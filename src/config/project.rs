use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, StratusError};
use crate::core::models::env_config::is_valid_name;

/// Current manifest format version supported by this build of Stratus.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Top-level project configuration read from `stratus.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    pub history: Option<HistorySection>,
}

impl ProjectConfig {
    /// Load the manifest from `stratus.toml` in the project directory.
    ///
    /// After parsing, validates the project name and file entries so a
    /// hand-edited manifest cannot point outputs outside the project.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let manifest_path = project_dir.join("stratus.toml");
        if !manifest_path.exists() {
            return Err(StratusError::ProjectNotFound {
                path: manifest_path,
            });
        }
        let content = std::fs::read_to_string(&manifest_path)?;
        let config: Self = toml::from_str(&content).map_err(|e| StratusError::InvalidProject {
            detail: format!("Failed to parse stratus.toml: {e}"),
        })?;

        // Check format version compatibility
        if config.project.format_version > CURRENT_FORMAT_VERSION {
            return Err(StratusError::FormatVersionTooNew {
                project_version: config.project.format_version,
                supported_version: CURRENT_FORMAT_VERSION,
            });
        }

        if !is_valid_name(&config.project.name) {
            return Err(StratusError::InvalidProject {
                detail: format!(
                    "project name '{}' is invalid; use lowercase letters, \
                     digits and hyphens, starting with a letter",
                    config.project.name
                ),
            });
        }

        validate_relative_path(&config.project.settings, "settings")?;
        validate_relative_path(&config.project.output, "output")?;
        if let Some(history) = &config.history {
            crate::cli::context::validate_simple_filename(&history.log_file, "history log file")?;
        }

        Ok(config)
    }

    /// Path of the settings document, relative to the project directory.
    pub fn settings_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.project.settings)
    }

    /// Directory synthesized templates are written to.
    pub fn out_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.project.output)
    }

    /// Directory deployment state is recorded in.
    pub fn state_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(".stratus").join("state")
    }

    /// Whether history recording is on (default: yes).
    pub fn history_enabled(&self) -> bool {
        self.history.as_ref().map(|h| h.enabled).unwrap_or(true)
    }

    /// Path of the history log file.
    pub fn history_path(&self, project_dir: &Path) -> PathBuf {
        let file = self
            .history
            .as_ref()
            .map(|h| h.log_file.as_str())
            .unwrap_or("history.log");
        project_dir.join(".stratus").join(file)
    }
}

/// The `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    /// Format version for backward compatibility. Defaults to 1 if missing.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Settings document path. Defaults to `settings.yaml`.
    #[serde(default = "default_settings_file")]
    pub settings: String,
    /// Synthesis output directory. Defaults to `stratus.out`.
    #[serde(default = "default_output_dir")]
    pub output: String,
    /// Environment used when `--context environment=...` is absent.
    pub default_environment: Option<String>,
}

fn default_format_version() -> u32 {
    1
}

fn default_settings_file() -> String {
    "settings.yaml".to_string()
}

fn default_output_dir() -> String {
    "stratus.out".to_string()
}

/// The `[history]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
    pub enabled: bool,
    pub log_file: String,
}

/// Reject separators and parent components so manifest entries stay
/// inside the project directory.
fn validate_relative_path(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StratusError::InvalidProject {
            detail: format!("{field} must not be empty"),
        });
    }
    let path = Path::new(value);
    if path.is_absolute()
        || value.contains("..")
        || value.starts_with('~')
    {
        return Err(StratusError::InvalidProject {
            detail: format!("{field} '{value}' must be a plain relative path inside the project"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> crate::core::errors::Result<ProjectConfig> {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("stratus.toml"), content).unwrap();
        ProjectConfig::load(tmp.path())
    }

    #[test]
    fn minimal_manifest_loads_with_defaults() {
        let config = parse("[project]\nname = \"demo\"\n").unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.format_version, 1);
        assert_eq!(config.project.settings, "settings.yaml");
        assert_eq!(config.project.output, "stratus.out");
        assert!(config.history_enabled());
    }

    #[test]
    fn history_log_file_must_be_simple() {
        let err = parse(
            "[project]\nname = \"demo\"\n\n[history]\nenabled = true\nlog_file = \"logs/deep.log\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, StratusError::InvalidProject { .. }));
    }

    #[test]
    fn missing_manifest_is_project_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = ProjectConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, StratusError::ProjectNotFound { .. }));
    }

    #[test]
    fn newer_format_version_rejected() {
        let err = parse("[project]\nname = \"demo\"\nformat_version = 99\n").unwrap_err();
        assert!(matches!(err, StratusError::FormatVersionTooNew { .. }));
    }

    #[test]
    fn invalid_project_name_rejected() {
        let err = parse("[project]\nname = \"Demo Project\"\n").unwrap_err();
        assert!(matches!(err, StratusError::InvalidProject { .. }));
    }

    #[test]
    fn traversal_in_settings_path_rejected() {
        let err = parse("[project]\nname = \"demo\"\nsettings = \"../outside.yaml\"\n")
            .unwrap_err();
        assert!(matches!(err, StratusError::InvalidProject { .. }));
    }

    #[test]
    fn history_section_controls_logging() {
        let config = parse(
            "[project]\nname = \"demo\"\n\n[history]\nenabled = false\nlog_file = \"history.log\"\n",
        )
        .unwrap();
        assert!(!config.history_enabled());
    }
}
