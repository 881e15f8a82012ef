//! Hot swap: replace live widget instances after their factory changed.
//!
//! For every loaded widget of the factory:
//!
//! 1. snapshot settings and input values
//! 2. instantiate from the new factory with `restoring = true`
//! 3. splice the replacement in under the same [`ComponentId`], either at
//!    the same parent index (parent marked `reloading` meanwhile) or in
//!    place of a floating root
//! 4. re-apply input values and focus
//!
//! Failures are per instance; the batch always runs to the end.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::controller::{ControllerError, ControllerInit};
use crate::error::ErrorLog;
use crate::factory::{FactoryId, WidgetFactory};
use crate::graph::{
    Component, ComponentId, ComponentKind, Graph, GraphEvent, RELOADING_PROPERTY, Widget,
};
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("component {0} is not a loaded widget")]
    NotLoaded(ComponentId),

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// Outcome of one [`hot_swap`] batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapReport {
    pub factory: FactoryId,
    pub swapped: Vec<ComponentId>,
    pub failed: Vec<(ComponentId, String)>,
}

impl SwapReport {
    pub fn is_empty(&self) -> bool {
        self.swapped.is_empty() && self.failed.is_empty()
    }
}

/// Replace every live instance of `factory` in `graph`.
pub fn hot_swap(graph: &mut Graph, factory: &Arc<WidgetFactory>, errors: &ErrorLog) -> SwapReport {
    let mut report = SwapReport {
        factory: factory.id().clone(),
        ..Default::default()
    };

    for id in graph.live_widgets(factory.id()) {
        match swap_instance(graph, id, factory) {
            Ok(()) => report.swapped.push(id),
            Err(err) => {
                errors.report(format!("swap:{}", factory.id()), &err);
                report.failed.push((id, err.to_string()));
            }
        }
    }

    if !report.is_empty() {
        log!(
            "swap";
            "{}: {} swapped, {} failed",
            report.factory,
            report.swapped.len(),
            report.failed.len()
        );
    }
    report
}

/// State carried from the old instance to its replacement.
struct Snapshot {
    component: Component,
    values: Vec<(String, Value)>,
    focused: bool,
}

fn snapshot(graph: &Graph, id: ComponentId) -> Result<Snapshot, SwapError> {
    let component = graph.get(id).ok_or(SwapError::NotLoaded(id))?;
    let old = component
        .as_widget()
        .filter(|w| w.is_loaded())
        .ok_or(SwapError::NotLoaded(id))?;

    let mut widget = Widget::new(old.factory_id.clone());
    widget.custom_name.clone_from(&old.custom_name);
    widget.fields = old.settings_snapshot();
    widget.inputs = old.inputs.clone();
    widget.outputs = old.outputs.clone();
    for input in widget.inputs.values_mut() {
        input.value = None;
    }

    let mut replacement = Component::new(id, ComponentKind::Widget(widget));
    replacement.properties = component.properties.clone();
    replacement.load_type = component.load_type;
    replacement.locked = component.locked;

    Ok(Snapshot {
        component: replacement,
        values: old.input_values().into_iter().collect(),
        focused: old.focused,
    })
}

fn swap_instance(
    graph: &mut Graph,
    id: ComponentId,
    factory: &Arc<WidgetFactory>,
) -> Result<(), SwapError> {
    let Snapshot {
        mut component,
        values,
        focused,
    } = snapshot(graph, id)?;

    let ComponentKind::Widget(widget) = &mut component.kind else {
        return Err(SwapError::NotLoaded(id));
    };
    let controller = factory.instantiate(ControllerInit {
        settings: widget.fields.clone(),
        restoring: true,
    })?;

    // Keep only the ports the new controller still declares.
    let inputs = controller.inputs();
    let outputs = controller.outputs();
    widget
        .inputs
        .retain(|name, _| inputs.iter().any(|p| p.name == *name));
    widget
        .outputs
        .retain(|name, _| outputs.iter().any(|p| p.name == *name));
    let widget = std::mem::replace(widget, Widget::new(factory.id().clone()));
    component.kind = ComponentKind::Widget(widget.with_controller(controller));

    match graph.parent_of(id) {
        Some(parent) => {
            let index = graph.index_in_parent(id).ok_or(SwapError::NotLoaded(id))?;
            graph.set_property(parent, RELOADING_PROPERTY, Value::from(factory.id().as_str()));
            graph.remove_child(parent, id);
            graph.insert(component);
            graph.add_child(parent, Some(index), Some(id));
            graph.remove_property(parent, RELOADING_PROPERTY);
        }
        None => graph.replace_root(component),
    }

    for (name, value) in values {
        let declared = graph
            .widget(id)
            .is_some_and(|w| w.inputs.contains_key(&name));
        if declared {
            graph.set_input(id, &name, value);
        }
    }
    if focused {
        graph.focus(id);
    }

    debug!("swap"; "{id} now runs {}", factory.id());
    graph.emit(GraphEvent::WidgetReplaced {
        id,
        factory: factory.id().clone(),
    });
    Ok(())
}
