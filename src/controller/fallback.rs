//! Stand-in controllers used when the real one cannot exist.
//!
//! Both keep the widget's settings untouched so a later reload with a working
//! factory restores the user's configuration.

use super::{Controller, Settings};

/// Shown for a widget whose factory id is not registered.
#[derive(Debug)]
pub struct NoFactoryController {
    pub factory_id: String,
    settings: Settings,
}

impl NoFactoryController {
    pub fn new(factory_id: impl Into<String>, settings: Settings) -> Self {
        Self {
            factory_id: factory_id.into(),
            settings,
        }
    }

    pub fn message(&self) -> String {
        format!("no factory registered for `{}`", self.factory_id)
    }
}

impl Controller for NoFactoryController {
    fn settings(&self) -> Settings {
        self.settings.clone()
    }
}

/// Shown for a widget whose controller failed to construct.
#[derive(Debug)]
pub struct ErrorController {
    pub factory_id: String,
    pub error: String,
    settings: Settings,
}

impl ErrorController {
    pub fn new(factory_id: impl Into<String>, error: impl Into<String>, settings: Settings) -> Self {
        Self {
            factory_id: factory_id.into(),
            error: error.into(),
            settings,
        }
    }
}

impl Controller for ErrorController {
    fn settings(&self) -> Settings {
        self.settings.clone()
    }
}
