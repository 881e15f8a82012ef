//! `[widgets]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [widgets]
//! dir = "widgets"          # Root holding one directory per widget
//! developer_mode = false   # Also treat lib/ changes as making sources stale
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Widget source tree settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetsConfig {
    /// Directory containing widget source directories (relative to config file).
    pub dir: PathBuf,

    /// Developer mode: library files count toward source staleness.
    pub developer_mode: bool,
}

impl Default for WidgetsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("widgets"),
            developer_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;

    #[test]
    fn test_widgets_config() {
        let config =
            RuntimeConfig::from_str("[widgets]\ndir = \"custom\"\ndeveloper_mode = true").unwrap();
        assert_eq!(config.widgets.dir.to_str(), Some("custom"));
        assert!(config.widgets.developer_mode);
    }
}
