use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::errors::{Result, StratusError};
use crate::core::models::env_config::is_valid_name;

static PROJECT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global project directory path.
///
/// `custom` may name either the project directory or the manifest file
/// itself; otherwise the current directory is used.
pub fn init(custom: Option<&str>) {
    let dir = custom
        .map(|raw| {
            let path = PathBuf::from(raw);
            if path.file_name() == Some(OsStr::new("stratus.toml")) {
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            } else {
                path
            }
        })
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = PROJECT_DIR.set(dir);
}

/// Get the current project directory path.
pub fn project_dir() -> &'static Path {
    PROJECT_DIR
        .get()
        .map(|p| p.as_path())
        .unwrap_or(Path::new("."))
}

/// Validate an environment name before it is used as part of a state
/// file path.
pub fn validate_env_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(StratusError::InvalidConfig {
            detail: format!(
                "environment name '{name}' is invalid; use lowercase letters, \
                 digits and hyphens, starting with a letter"
            ),
        })
    }
}

/// Validate that a configured filename is a bare file name, with no
/// directory components.
pub fn validate_simple_filename(value: &str, label: &str) -> Result<()> {
    let clean = !value.is_empty()
        && !value.starts_with('.')
        && !value.contains('/')
        && !value.contains('\\')
        && !value.contains("..");
    if clean {
        Ok(())
    } else {
        Err(StratusError::InvalidProject {
            detail: format!("{label} '{value}' must be a plain file name"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_names_checked() {
        assert!(validate_env_name("dev").is_ok());
        assert!(validate_env_name("staging-eu2").is_ok());
        assert!(validate_env_name("../etc").is_err());
        assert!(validate_env_name("Prod").is_err());
        assert!(validate_env_name("").is_err());
    }

    #[test]
    fn filenames_checked() {
        assert!(validate_simple_filename("history.log", "log").is_ok());
        assert!(validate_simple_filename("a/b.log", "log").is_err());
        assert!(validate_simple_filename("..", "log").is_err());
        assert!(validate_simple_filename(".hidden", "log").is_err());
        assert!(validate_simple_filename("", "log").is_err());
    }
}
