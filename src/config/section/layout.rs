//! `[layout]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [layout]
//! no_empty_container = true  # Close a window once its last component leaves
//! locked = false             # Global layout lock
//! ```

use serde::{Deserialize, Serialize};

/// Layout graph policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Request closing the owning window when a container loses its last child.
    pub no_empty_container: bool,

    /// Initial value of the global lock flag.
    pub locked: bool,
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;

    #[test]
    fn test_layout_defaults() {
        let config = RuntimeConfig::from_str("").unwrap();
        assert!(!config.layout.no_empty_container);
        assert!(!config.layout.locked);
    }
}
