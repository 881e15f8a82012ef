//! Controllers: the behavior behind a widget.
//!
//! A [`ControllerType`] is what a dynamic module resolves to; it is `Send +
//! Sync` so it can travel from a build worker to the UI thread. The
//! [`Controller`] instances it creates live on the UI thread only.

mod fallback;

pub use fallback::{ErrorController, NoFactoryController};

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Persisted per-instance configuration (`name -> value`).
pub type Settings = BTreeMap<String, Value>;

/// Declared data-flow port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Descriptive metadata shown in widget pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetInfo {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    /// Ranked first when several factories offer the same feature.
    pub preferred: bool,
    /// Hidden from pickers.
    pub ignored: bool,
}

impl WidgetInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Construction arguments for a controller.
#[derive(Debug, Clone, Default)]
pub struct ControllerInit {
    pub settings: Settings,
    /// Settings come from a live or persisted instance: do not overwrite
    /// them with defaults during initialization.
    pub restoring: bool,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("failed to create controller `{type_name}`: {message}")]
    Instantiation { type_name: String, message: String },

    #[error("controller `{type_name}` panicked during construction: {message}")]
    Panicked { type_name: String, message: String },
}

/// Factory side of a controller, resolved from a dynamic module.
pub trait ControllerType: Send + Sync {
    /// Simple type name; the default factory id.
    fn type_name(&self) -> &str;

    fn info(&self) -> WidgetInfo {
        WidgetInfo::named(self.type_name())
    }

    /// Called once when the owning factory is registered.
    fn init(&self) {}

    /// Called once when the owning factory is disposed.
    fn dispose(&self) {}

    fn instantiate(&self, init: ControllerInit) -> Result<Box<dyn Controller>, ControllerError>;
}

/// A live controller attached to one widget.
pub trait Controller {
    fn inputs(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    /// Current persistable configuration.
    fn settings(&self) -> Settings;

    fn set_input(&mut self, _name: &str, _value: &Value) {}

    fn focus(&mut self) {}

    /// Re-apply a widget's `skin.css` without rebuilding.
    fn reload_skin(&mut self, _stylesheet: &Path) {}

    /// Release held resources. Called exactly once, before drop.
    fn close(&mut self) {}
}
