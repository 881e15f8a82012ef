//! Widget leaf: a controller plus its persisted fields and data-flow ports.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::ComponentId;
use crate::controller::{Controller, PortSpec, Settings};
use crate::factory::FactoryId;

/// Property key prefix storing an input's bindings on disk.
pub const IO_PREFIX: &str = "io:";

/// Reference to another widget's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub widget: ComponentId,
    pub name: String,
}

impl OutputRef {
    pub fn new(widget: ComponentId, name: impl Into<String>) -> Self {
        Self {
            widget,
            name: name.into(),
        }
    }

    /// Parse `name,uuid:name,uuid`. Malformed pairs are skipped.
    pub fn parse_list(value: &str) -> Vec<Self> {
        value
            .split(':')
            .filter_map(|pair| {
                let (name, id) = pair.split_once(',')?;
                let widget = ComponentId::from_str(id.trim()).ok()?;
                Some(Self::new(widget, name.trim()))
            })
            .collect()
    }

    pub fn format_list(refs: &[Self]) -> String {
        refs.iter()
            .map(|r| format!("{},{}", r.name, r.widget))
            .collect::<Vec<_>>()
            .join(":")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub type_name: String,
    pub value: Option<Value>,
    pub bindings: Vec<OutputRef>,
}

impl Input {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: None,
            bindings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub type_name: String,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetStatus {
    /// Controller not created yet.
    Unloaded,
    Loaded,
    /// Placeholder controller: factory missing.
    NoFactory,
    /// Error controller: construction failed.
    Failed(String),
    Closed,
}

pub struct Widget {
    pub factory_id: FactoryId,
    pub custom_name: String,
    /// Persisted settings.
    pub fields: Settings,
    pub inputs: BTreeMap<String, Input>,
    pub outputs: BTreeMap<String, Output>,
    pub focused: bool,
    pub(super) status: WidgetStatus,
    pub(super) controller: Option<Box<dyn Controller>>,
}

impl Widget {
    pub fn new(factory_id: impl Into<FactoryId>) -> Self {
        Self {
            factory_id: factory_id.into(),
            custom_name: String::new(),
            fields: Settings::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            focused: false,
            status: WidgetStatus::Unloaded,
            controller: None,
        }
    }

    /// Widget with an already created controller.
    pub fn with_controller(mut self, controller: Box<dyn Controller>) -> Self {
        self.declare_ports(&controller.inputs(), &controller.outputs());
        self.controller = Some(controller);
        self.status = WidgetStatus::Loaded;
        self
    }

    pub fn status(&self) -> &WidgetStatus {
        &self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.controller.is_some()
    }

    pub fn controller(&self) -> Option<&dyn Controller> {
        self.controller.as_deref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut (dyn Controller + 'static)> {
        self.controller.as_deref_mut()
    }

    /// Persisted fields overlaid with the controller's current settings.
    pub fn settings_snapshot(&self) -> Settings {
        let mut settings = self.fields.clone();
        if let Some(controller) = &self.controller {
            settings.extend(controller.settings());
        }
        settings
    }

    /// Current input values by name.
    pub fn input_values(&self) -> BTreeMap<String, Value> {
        self.inputs
            .iter()
            .filter_map(|(name, input)| Some((name.clone(), input.value.clone()?)))
            .collect()
    }

    /// Add ports the controller declares, keeping existing bindings and values.
    pub(super) fn declare_ports(&mut self, inputs: &[PortSpec], outputs: &[PortSpec]) {
        for spec in inputs {
            self.inputs
                .entry(spec.name.clone())
                .and_modify(|input| input.type_name.clone_from(&spec.type_name))
                .or_insert_with(|| Input::new(&spec.type_name));
        }
        for spec in outputs {
            self.outputs
                .entry(spec.name.clone())
                .or_insert_with(|| Output {
                    type_name: spec.type_name.clone(),
                    value: None,
                });
        }
    }

    /// Close and drop the controller. Returns whether one was held.
    pub(super) fn close_controller(&mut self) -> bool {
        let Some(mut controller) = self.controller.take() else {
            self.status = WidgetStatus::Closed;
            return false;
        };
        self.fields.extend(controller.settings());
        controller.close();
        self.status = WidgetStatus::Closed;
        true
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("factory_id", &self.factory_id)
            .field("custom_name", &self.custom_name)
            .field("status", &self.status)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_refs_roundtrip_text() {
        let a = ComponentId::new();
        let b = ComponentId::new();
        let refs = vec![OutputRef::new(a, "song"), OutputRef::new(b, "volume")];
        let text = OutputRef::format_list(&refs);
        assert_eq!(text, format!("song,{a}:volume,{b}"));
        assert_eq!(OutputRef::parse_list(&text), refs);
    }

    #[test]
    fn test_malformed_pairs_are_skipped() {
        let a = ComponentId::new();
        let refs = OutputRef::parse_list(&format!("broken:song,{a}:x,not-a-uuid"));
        assert_eq!(refs, vec![OutputRef::new(a, "song")]);
    }
}
