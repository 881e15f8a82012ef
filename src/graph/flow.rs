//! Data flow between widget ports.

use serde_json::Value;

use super::{ComponentId, Graph, OutputRef};

impl Graph {
    /// Bind `widget.input` to another widget's output. Returns `false` if
    /// the input does not exist.
    pub fn bind(&mut self, widget: ComponentId, input: &str, source: OutputRef) -> bool {
        let Some(port) = self.widget_mut(widget).and_then(|w| w.inputs.get_mut(input)) else {
            return false;
        };
        if !port.bindings.contains(&source) {
            port.bindings.push(source);
        }
        true
    }

    pub fn unbind(&mut self, widget: ComponentId, input: &str, source: &OutputRef) -> bool {
        let Some(port) = self.widget_mut(widget).and_then(|w| w.inputs.get_mut(input)) else {
            return false;
        };
        let before = port.bindings.len();
        port.bindings.retain(|b| b != source);
        port.bindings.len() != before
    }

    /// Set an input value and forward it to the controller.
    pub fn set_input(&mut self, widget: ComponentId, input: &str, value: Value) -> bool {
        let Some(w) = self.widget_mut(widget) else {
            return false;
        };
        let Some(port) = w.inputs.get_mut(input) else {
            return false;
        };
        port.value = Some(value.clone());
        if let Some(controller) = w.controller_mut() {
            controller.set_input(input, &value);
        }
        true
    }

    /// Publish an output value to every bound input. Returns the number of
    /// inputs updated.
    pub fn publish_output(&mut self, widget: ComponentId, output: &str, value: Value) -> usize {
        match self.widget_mut(widget).and_then(|w| w.outputs.get_mut(output)) {
            Some(port) => port.value = Some(value.clone()),
            None => return 0,
        }

        let source = OutputRef::new(widget, output);
        let targets: Vec<(ComponentId, String)> = self
            .widgets()
            .into_iter()
            .filter_map(|id| self.widget(id).map(|w| (id, w)))
            .flat_map(|(id, w)| {
                w.inputs
                    .iter()
                    .filter(|(_, input)| input.bindings.contains(&source))
                    .map(move |(name, _)| (id, name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        targets
            .into_iter()
            .filter(|(id, name)| self.set_input(*id, name, value.clone()))
            .count()
    }

    /// Give a widget focus.
    pub fn focus(&mut self, widget: ComponentId) {
        let Some(w) = self.widget_mut(widget) else {
            return;
        };
        w.focused = true;
        if let Some(controller) = w.controller_mut() {
            controller.focus();
        }
    }
}
