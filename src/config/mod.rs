//! Runtime configuration management for `quaver.toml`.
//!
//! # Sections
//!
//! | Section             | Purpose                                         |
//! |---------------------|-------------------------------------------------|
//! | `[widgets]`         | Widget source root, developer mode              |
//! | `[build]`           | Compiler timeout, debounce, parallelism, paths  |
//! | `[build.compilers]` | Compiler program per source language            |
//! | `[layout]`          | Empty-container policy, global lock             |

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{BuildSectionConfig, CompilersConfig, LayoutConfig, WidgetsConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::log;

/// Root configuration structure representing quaver.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory of the config file; relative paths resolve against it.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub widgets: WidgetsConfig,

    #[serde(default)]
    pub build: BuildSectionConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}

impl RuntimeConfig {
    /// Load configuration from a file. A missing file yields defaults rooted
    /// at the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = if path.exists() {
            let content =
                fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
            Self::from_str(&content)?
        } else {
            log!("config"; "{} not found, using defaults", path.display());
            Self::default()
        };

        config.set_root(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the root directory and absolutize configured paths against it.
    pub fn set_root(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.widgets.dir = self.root_join(&self.widgets.dir);
        self.build.classpath = self
            .build
            .classpath
            .iter()
            .map(|p| self.root_join(p))
            .collect();
    }

    /// Join a path with the root directory (absolute paths pass through).
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    pub fn widgets_dir(&self) -> &Path {
        &self.widgets.dir
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.timeout_secs == 0 {
            return Err(ConfigError::validation(
                "build.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.build.parallelism == Some(0) {
            return Err(ConfigError::validation(
                "build.parallelism",
                "must be greater than zero",
            ));
        }
        if self.build.encoding.trim().is_empty() {
            return Err(ConfigError::validation("build.encoding", "must not be empty"));
        }
        Ok(())
    }
}
