//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! timeout_secs = 90           # Wall-clock limit for one compiler run
//! debounce_ms = 500           # Coalescing window for file events
//! parallelism = 2             # Concurrent builds (default: ceil(cores / 4))
//! encoding = "UTF-8"          # Source encoding passed to compilers
//! classpath = ["lib/app.jar"] # Application classpath entries
//!
//! [build.compilers]
//! kotlin = "kotlinc"
//! java = "javac"
//! rust = "rustc"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Widget build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    pub timeout_secs: u64,
    pub debounce_ms: u64,
    /// `None` derives the worker count from available cores.
    pub parallelism: Option<usize>,
    pub encoding: String,
    /// Application classpath entries (relative to config file).
    pub classpath: Vec<PathBuf>,
    pub compilers: CompilersConfig,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 90,
            debounce_ms: 500,
            parallelism: None,
            encoding: "UTF-8".to_string(),
            classpath: Vec::new(),
            compilers: CompilersConfig::default(),
        }
    }
}

impl BuildSectionConfig {
    /// Worker count: configured value, else `ceil(cores / 4)`.
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4);
            cores.div_ceil(4)
        })
    }
}

/// Compiler programs per source language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilersConfig {
    pub kotlin: String,
    pub java: String,
    pub rust: String,
}

impl Default for CompilersConfig {
    fn default() -> Self {
        Self {
            kotlin: "kotlinc".to_string(),
            java: "javac".to_string(),
            rust: "rustc".to_string(),
        }
    }
}
