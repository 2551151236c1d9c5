//! Per-project configuration.
//!
//! The project directory itself is injected through the CLI (or the
//! `PWAKIT_PROJECT_DIR` environment variable). An optional `pwakit.toml`
//! inside that directory overrides the output-directory name and the
//! subprocess timeouts; the staged artifact set is fixed and not
//! configurable.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Name of the optional per-project config file.
pub const CONFIG_FILE: &str = "pwakit.toml";

fn default_dist_dir() -> String {
    "dist".to_string()
}

const fn default_install_timeout() -> u64 {
    300
}

const fn default_build_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectConfig {
    /// Directory the bundler writes into, relative to the project root.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,

    /// Wall-clock limit for `install`, in seconds.
    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,

    /// Wall-clock limit for `check`, in seconds.
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            install_timeout_secs: default_install_timeout(),
            build_timeout_secs: default_build_timeout(),
        }
    }
}

/// Try to load `pwakit.toml` from `project_dir`. Returns `Ok(Some(config))`
/// on success, `Ok(None)` if the file does not exist, or `Err` for other
/// I/O / parse errors.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or contains
/// invalid TOML.
pub fn try_load(project_dir: &Path) -> anyhow::Result<Option<ProjectConfig>> {
    let path = project_dir.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let config = toml::from_str(&content)
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(Some(config))
}
