//! Conversion between the live graph and records.

use rustc_hash::FxHashSet;
use serde_json::Value;

use super::{
    BiRecord, ComponentRecord, FreeFormRecord, RecordError, SeqRecord, SwitchRecord, UniRecord,
    WidgetRecord,
};
use crate::graph::{
    BiState, Component, ComponentId, ComponentKind, Container, Graph, IO_PREFIX, Layout,
    OutputRef, SwitchState, Widget,
};

/// Snapshot the subtree rooted at `id`. Widget settings include the live
/// controller's current settings.
pub fn to_record(graph: &Graph, id: ComponentId) -> Result<ComponentRecord, RecordError> {
    let component = graph.get(id).ok_or(RecordError::Unknown(id))?;
    let properties = component.properties.clone();

    let container = match &component.kind {
        ComponentKind::Widget(widget) => {
            let mut properties = properties;
            for (name, input) in &widget.inputs {
                if !input.bindings.is_empty() {
                    properties.insert(
                        format!("{IO_PREFIX}{name}"),
                        Value::String(OutputRef::format_list(&input.bindings)),
                    );
                }
            }
            return Ok(ComponentRecord::Widget(WidgetRecord {
                id,
                loading: component.load_type,
                locked: component.locked,
                factory_id: widget.factory_id.clone(),
                name_ui: widget.custom_name.clone(),
                settings: widget.settings_snapshot(),
                properties,
            }));
        }
        ComponentKind::Container(container) => container,
    };

    let children = container
        .children()
        .iter()
        .map(|(index, child)| Ok((*index, to_record(graph, *child)?)))
        .collect::<Result<_, RecordError>>()?;

    let (loading, locked) = (component.load_type, component.locked);
    Ok(match &container.layout {
        Layout::Uni => ComponentRecord::Uni(UniRecord {
            id,
            loading,
            locked,
            children,
            properties,
        }),
        Layout::Bi(state) => ComponentRecord::Bi(BiRecord {
            id,
            loading,
            locked,
            orientation: state.orientation,
            position: state.position,
            collapsed: state.collapsed,
            absolute_size: state.absolute_size,
            joined: state.joined,
            children,
            properties,
        }),
        Layout::Seq { orientation } => ComponentRecord::Seq(SeqRecord {
            id,
            loading,
            locked,
            orientation: *orientation,
            children,
            properties,
        }),
        Layout::FreeForm { boxes } => ComponentRecord::FreeForm(FreeFormRecord {
            id,
            loading,
            locked,
            // Boxes of cleared slots are not persisted
            boxes: boxes
                .iter()
                .filter(|(index, _)| container.child(**index).is_some())
                .map(|(index, placement)| (*index, *placement))
                .collect(),
            children,
            properties,
        }),
        Layout::Switch(state) => ComponentRecord::Switch(SwitchRecord {
            id,
            loading,
            locked,
            translate: state.translate,
            snap: state.snap,
            zoom: state.zoom,
            children,
            properties,
        }),
    })
}

/// Instantiate a record into the graph as a detached subtree.
///
/// Returns `Ok(None)` for [`ComponentRecord::None`]. Ids already in the
/// graph or repeated within the record are rejected before anything is
/// inserted; deduplicate first when loading launchers.
pub fn to_domain(
    graph: &mut Graph,
    record: &ComponentRecord,
) -> Result<Option<ComponentId>, RecordError> {
    validate(graph, record)?;
    Ok(build(graph, record))
}

fn validate(graph: &Graph, record: &ComponentRecord) -> Result<(), RecordError> {
    let mut seen = FxHashSet::default();
    for id in record.ids() {
        if !seen.insert(id) || graph.contains(id) {
            return Err(RecordError::DuplicateId(id));
        }
    }

    let mut invalid = None;
    record.visit(&mut |r| {
        if invalid.is_some() {
            return;
        }
        let (Some(layout), Some(children)) = (layout_of(r), r.children()) else {
            return;
        };
        if let Some(index) = children.keys().find(|i| !layout.accepts(**i)) {
            invalid = Some(RecordError::InvalidIndex {
                layout: layout.name(),
                index: *index,
            });
        }
    });
    invalid.map_or(Ok(()), Err)
}

fn layout_of(record: &ComponentRecord) -> Option<Layout> {
    Some(match record {
        ComponentRecord::None | ComponentRecord::Widget(_) => return None,
        ComponentRecord::Uni(_) => Layout::Uni,
        ComponentRecord::Bi(r) => Layout::Bi(BiState {
            orientation: r.orientation,
            position: r.position,
            collapsed: r.collapsed,
            absolute_size: r.absolute_size,
            joined: r.joined,
        }),
        ComponentRecord::Seq(r) => Layout::Seq {
            orientation: r.orientation,
        },
        ComponentRecord::FreeForm(r) => Layout::FreeForm {
            boxes: r.boxes.clone(),
        },
        ComponentRecord::Switch(r) => Layout::Switch(SwitchState {
            translate: r.translate,
            snap: r.snap,
            zoom: r.zoom,
        }),
    })
}

fn build(graph: &mut Graph, record: &ComponentRecord) -> Option<ComponentId> {
    let (id, loading, locked, properties) = match record {
        ComponentRecord::None => return None,
        ComponentRecord::Widget(r) => {
            let mut properties = r.properties.clone();
            let mut widget = Widget::new(r.factory_id.clone());
            widget.custom_name.clone_from(&r.name_ui);
            widget.fields.clone_from(&r.settings);

            let io_keys: Vec<String> = properties
                .keys()
                .filter(|k| k.starts_with(IO_PREFIX))
                .cloned()
                .collect();
            for key in io_keys {
                let Some(Value::String(value)) = properties.remove(&key) else {
                    continue;
                };
                let name = key.trim_start_matches(IO_PREFIX).to_string();
                let mut input = crate::graph::Input::new("");
                input.bindings = OutputRef::parse_list(&value);
                widget.inputs.insert(name, input);
            }

            let mut component = Component::new(r.id, ComponentKind::Widget(widget));
            component.load_type = r.loading;
            component.locked = r.locked;
            component.properties = properties;
            return Some(graph.insert(component));
        }
        ComponentRecord::Uni(r) => (r.id, r.loading, r.locked, &r.properties),
        ComponentRecord::Bi(r) => (r.id, r.loading, r.locked, &r.properties),
        ComponentRecord::Seq(r) => (r.id, r.loading, r.locked, &r.properties),
        ComponentRecord::FreeForm(r) => (r.id, r.loading, r.locked, &r.properties),
        ComponentRecord::Switch(r) => (r.id, r.loading, r.locked, &r.properties),
    };

    let layout = layout_of(record)?;
    let mut component = Component::new(id, ComponentKind::Container(Container::new(layout)));
    component.load_type = loading;
    component.locked = locked;
    component.properties = properties.clone();
    graph.insert(component);

    if let Some(children) = record.children() {
        for (index, child) in children {
            if let Some(child_id) = build(graph, child) {
                graph.add_child(id, Some(*index), Some(child_id));
            }
        }
    }
    Some(id)
}
