//! Fake controllers shared by unit tests.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::controller::{
    Controller, ControllerError, ControllerInit, ControllerType, PortSpec, Settings,
};
use crate::factory::WidgetFactory;

/// Shared record of what fake controllers were asked to do.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().iter().any(|e| e == entry)
    }
}

/// Controller type with one `song` input and one `playing` output. Fresh
/// instances get `format = "default"`; restoring instances keep what they
/// were given.
pub struct EchoType {
    pub name: String,
    pub version: u32,
    pub fail: bool,
    pub journal: Journal,
}

impl EchoType {
    pub fn new(name: &str, version: u32, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            version,
            fail: false,
            journal: journal.clone(),
        })
    }

    pub fn failing(name: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            version: 0,
            fail: true,
            journal: journal.clone(),
        })
    }
}

impl ControllerType for EchoType {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self, init: ControllerInit) -> Result<Box<dyn Controller>, ControllerError> {
        if self.fail {
            return Err(ControllerError::Instantiation {
                type_name: self.name.clone(),
                message: "refusing to start".into(),
            });
        }
        let mut settings = init.settings;
        if !init.restoring {
            settings.insert("format".into(), json!("default"));
        }
        self.journal.push(format!(
            "create {} v{} restoring={}",
            self.name, self.version, init.restoring
        ));
        Ok(Box::new(EchoController {
            name: self.name.clone(),
            version: self.version,
            settings,
            journal: self.journal.clone(),
        }))
    }
}

pub struct EchoController {
    name: String,
    version: u32,
    settings: Settings,
    journal: Journal,
}

impl Controller for EchoController {
    fn inputs(&self) -> Vec<PortSpec> {
        vec![PortSpec::new("song", "Song")]
    }

    fn outputs(&self) -> Vec<PortSpec> {
        vec![PortSpec::new("playing", "Song")]
    }

    fn settings(&self) -> Settings {
        self.settings.clone()
    }

    fn set_input(&mut self, name: &str, value: &Value) {
        self.journal
            .push(format!("{} v{} input {name}={value}", self.name, self.version));
    }

    fn focus(&mut self) {
        self.journal
            .push(format!("{} v{} focus", self.name, self.version));
    }

    fn reload_skin(&mut self, stylesheet: &std::path::Path) {
        self.journal.push(format!(
            "{} v{} skin {}",
            self.name,
            self.version,
            stylesheet.display()
        ));
    }

    fn close(&mut self) {
        self.journal
            .push(format!("{} v{} close", self.name, self.version));
    }
}

pub fn echo_factory(name: &str, version: u32, journal: &Journal) -> Arc<WidgetFactory> {
    Arc::new(WidgetFactory::new(EchoType::new(name, version, journal)))
}
