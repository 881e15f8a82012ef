//! Dynamic modules: loading compiled widget output.
//!
//! The build pipeline never touches a concrete loading mechanism. It asks the
//! [`LoaderSet`] for the loader of a source language, loads the output scope,
//! and resolves the widget's qualified name to a [`ControllerType`]:
//!
//! ```text
//! ModuleScope --load--> DynamicModule --resolve(name)--> ControllerType --instantiate--> Controller
//! ```
//!
//! Unloading is reference counted: a module stays mapped while any
//! `Arc<dyn DynamicModule>`, resolved controller type or live controller
//! still refers to it, and is released when the last one drops.

mod native;

pub use native::{ABI_VERSION, ENTRY_SYMBOL, NativeControllerV1, NativeLoader};

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::build::SourceLanguage;
use crate::controller::ControllerType;

/// Everything a loader may see: the compiler output plus per-widget libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleScope {
    pub language: SourceLanguage,
    pub output_dir: PathBuf,
    pub libraries: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("no module loader available for {0} sources")]
    NoLoader(SourceLanguage),

    #[error("no loadable artifact in `{0}`")]
    NoArtifact(PathBuf),

    #[error("failed to load `{path}`")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("type `{0}` not found in module")]
    NotFound(String),

    #[error("type `{name}` is not a widget controller: {reason}")]
    NotAController { name: String, reason: String },
}

/// A loaded unit of compiled widget code.
pub trait DynamicModule: Send + Sync {
    /// Resolve a fully-qualified type name to a controller type.
    fn resolve(&self, qualified_name: &str) -> Result<Arc<dyn ControllerType>, ModuleError>;
}

/// Loads a [`ModuleScope`] in isolation from other widgets.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, scope: &ModuleScope) -> Result<Arc<dyn DynamicModule>, ModuleError>;
}

/// Loader per source language.
#[derive(Clone)]
pub struct LoaderSet {
    loaders: FxHashMap<SourceLanguage, Arc<dyn ModuleLoader>>,
}

impl LoaderSet {
    /// No loaders at all.
    pub fn empty() -> Self {
        Self {
            loaders: FxHashMap::default(),
        }
    }

    /// Register (or replace) the loader for `language`.
    pub fn with(mut self, language: SourceLanguage, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loaders.insert(language, loader);
        self
    }

    pub fn get(&self, language: SourceLanguage) -> Result<&Arc<dyn ModuleLoader>, ModuleError> {
        self.loaders
            .get(&language)
            .ok_or(ModuleError::NoLoader(language))
    }

    /// Load `scope` with the loader registered for its language.
    pub fn load(&self, scope: &ModuleScope) -> Result<Arc<dyn DynamicModule>, ModuleError> {
        self.get(scope.language)?.load(scope)
    }
}

impl Default for LoaderSet {
    /// Native libraries are loadable out of the box; JVM languages need a
    /// host-supplied loader.
    fn default() -> Self {
        Self::empty().with(SourceLanguage::Rust, Arc::new(NativeLoader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_loaders() {
        let loaders = LoaderSet::default();
        assert!(loaders.get(SourceLanguage::Rust).is_ok());
        assert!(matches!(
            loaders.get(SourceLanguage::Kotlin),
            Err(ModuleError::NoLoader(SourceLanguage::Kotlin))
        ));
    }

    #[test]
    fn test_no_loader_message() {
        let err = LoaderSet::empty()
            .load(&ModuleScope {
                language: SourceLanguage::Java,
                output_dir: PathBuf::from("out"),
                libraries: Vec::new(),
            })
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "no module loader available for Java sources");
    }
}
