//! Component graph: an arena of components keyed by [`ComponentId`] with a
//! parent side table.
//!
//! # Invariants
//!
//! - Every non-root component has exactly one parent and sits in exactly one
//!   of that parent's slots.
//! - Container slots only use indexes from the layout's domain; writing
//!   outside it is a programming error and panics.
//! - All mutation happens on the UI thread that created the graph.
//!
//! Mutations queue [`GraphEvent`]s; the UI drains them with
//! [`Graph::drain_events`].

mod component;
mod container;
mod event;
mod flow;
mod load;
mod widget;

#[cfg(test)]
mod tests;

pub use component::{
    Component, ComponentId, ComponentKind, LoadType, Properties, RELOADING_PROPERTY,
};
pub use container::{BiState, Container, FreeFormBox, Layout, Orientation, SwitchState};
pub use event::GraphEvent;
pub use load::LoadOutcome;
pub use widget::{IO_PREFIX, Input, Output, OutputRef, Widget, WidgetStatus};

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::config::LayoutConfig;
use crate::core::UiThread;
use crate::debug;
use crate::factory::{FactoryId, LiveInstances};

/// Window (or other top-level slot) hosting a root component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub u32);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

pub struct Graph {
    nodes: FxHashMap<ComponentId, Component>,
    parents: FxHashMap<ComponentId, ComponentId>,
    hosts: BTreeMap<HostId, ComponentId>,
    global_lock: bool,
    no_empty_container: bool,
    events: Vec<GraphEvent>,
    live: LiveInstances,
    ui: UiThread,
}

impl Graph {
    /// Graph owned by the calling thread.
    pub fn new(policy: &LayoutConfig, live: LiveInstances) -> Self {
        Self {
            nodes: FxHashMap::default(),
            parents: FxHashMap::default(),
            hosts: BTreeMap::new(),
            global_lock: policy.locked,
            no_empty_container: policy.no_empty_container,
            events: Vec::new(),
            live,
            ui: UiThread::current(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.ui.assert_current("get_mut");
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent_of(&self, id: ComponentId) -> Option<ComponentId> {
        self.parents.get(&id).copied()
    }

    pub fn container(&self, id: ComponentId) -> Option<&Container> {
        self.get(id)?.as_container()
    }

    pub fn widget(&self, id: ComponentId) -> Option<&Widget> {
        self.get(id)?.as_widget()
    }

    pub fn widget_mut(&mut self, id: ComponentId) -> Option<&mut Widget> {
        self.get_mut(id)?.as_widget_mut()
    }

    /// Index of `id` within its parent.
    pub fn index_in_parent(&self, id: ComponentId) -> Option<i32> {
        let parent = self.parent_of(id)?;
        self.container(parent)?.index_of(id)
    }

    /// Topmost ancestor (the component itself when it has no parent).
    pub fn root_of(&self, mut id: ComponentId) -> ComponentId {
        while let Some(parent) = self.parent_of(id) {
            id = parent;
        }
        id
    }

    pub fn host_of(&self, root: ComponentId) -> Option<HostId> {
        self.hosts
            .iter()
            .find_map(|(host, id)| (*id == root).then_some(*host))
    }

    pub fn root_at(&self, host: HostId) -> Option<ComponentId> {
        self.hosts.get(&host).copied()
    }

    pub fn hosts(&self) -> impl Iterator<Item = (HostId, ComponentId)> + '_ {
        self.hosts.iter().map(|(h, id)| (*h, *id))
    }

    /// `id` and everything below it, parents before children.
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !self.contains(next) {
                continue;
            }
            out.push(next);
            if let Some(container) = self.container(next) {
                stack.extend(container.children().values().rev());
            }
        }
        out
    }

    /// Widgets of `factory` that hold a controller.
    pub fn live_widgets(&self, factory: &FactoryId) -> Vec<ComponentId> {
        let mut ids: Vec<_> = self
            .nodes
            .values()
            .filter(|c| {
                c.as_widget()
                    .is_some_and(|w| w.is_loaded() && w.factory_id == *factory)
            })
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }

    /// All widget ids, sorted.
    pub fn widgets(&self) -> Vec<ComponentId> {
        let mut ids: Vec<_> = self
            .nodes
            .values()
            .filter(|c| c.as_widget().is_some())
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn live_instances(&self) -> &LiveInstances {
        &self.live
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub(crate) fn emit(&mut self, event: GraphEvent) {
        debug!("graph"; "{:?}", event);
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Arena
    // ========================================================================

    /// Add a detached component (and nothing else) to the arena.
    ///
    /// # Panics
    ///
    /// If the id is already present.
    pub fn insert(&mut self, mut component: Component) -> ComponentId {
        self.ui.assert_current("insert");
        let id = component.id;
        assert!(!self.contains(id), "component {id} is already in the graph");

        component.locked_effective = self.global_lock || component.locked;
        if let ComponentKind::Widget(widget) = &component.kind
            && widget.is_loaded()
        {
            self.live.increment(&widget.factory_id);
        }
        self.nodes.insert(id, component);
        id
    }

    pub fn set_property(&mut self, id: ComponentId, key: &str, value: Value) {
        if let Some(component) = self.get_mut(id) {
            component.properties.insert(key.to_string(), value);
        }
    }

    pub fn remove_property(&mut self, id: ComponentId, key: &str) -> Option<Value> {
        self.get_mut(id)?.properties.remove(key)
    }

    // ========================================================================
    // Container mutation
    // ========================================================================

    /// Put `child` at `index` of `container`, or clear the slot for `None`.
    ///
    /// A `None` index is a no-op. `child` is detached from its previous
    /// parent or host first. The displaced occupant, if any, is detached
    /// (not closed) and returned.
    ///
    /// # Panics
    ///
    /// If `container` is not a container or `index` is outside its layout's
    /// domain.
    pub fn add_child(
        &mut self,
        container: ComponentId,
        index: Option<i32>,
        child: Option<ComponentId>,
    ) -> Option<ComponentId> {
        let (displaced, vacated) = self.set_child(container, index, child);
        if index.is_some() {
            self.check_empty(container);
        }
        if let Some(vacated) = vacated {
            self.check_empty(vacated);
        }
        displaced
    }

    /// Slot write without the empty-container check.
    /// Returns (displaced, previous slot of `child` in another container).
    fn set_child(
        &mut self,
        container: ComponentId,
        index: Option<i32>,
        child: Option<ComponentId>,
    ) -> (Option<ComponentId>, Option<ComponentId>) {
        self.ui.assert_current("add_child");
        let Some(index) = index else {
            return (None, None);
        };
        {
            let target = self
                .container(container)
                .unwrap_or_else(|| panic!("component {container} is not a container"));
            assert!(
                target.layout.accepts(index),
                "index {index} is outside the {} container domain",
                target.layout.name()
            );
        }

        // Detach the incoming child from wherever it currently is.
        let mut vacated = None;
        if let Some(child) = child {
            assert!(self.contains(child), "component {child} is not in the graph");
            assert!(
                !self.descendants(child).contains(&container),
                "cannot place {child} inside its own subtree"
            );
            if let Some(old_parent) = self.parent_of(child) {
                let old_index = self.container(old_parent).and_then(|c| c.index_of(child));
                if old_parent == container && old_index == Some(index) {
                    return (None, None);
                }
                if let Some(old_index) = old_index {
                    self.write_slot(old_parent, old_index, None);
                    if old_parent != container {
                        vacated = Some(old_parent);
                    }
                }
            }
            self.hosts.retain(|_, root| *root != child);
        }

        let displaced = self.write_slot(container, index, child);
        if let Some(displaced) = displaced.filter(|d| Some(*d) != child) {
            self.parents.remove(&displaced);
            self.refresh_locks(displaced);
        }

        self.relink(container);
        self.refresh_locks(container);
        (displaced.filter(|d| Some(*d) != child), vacated)
    }

    /// Write one slot, keep the parent table in sync and emit `SlotChanged`.
    fn write_slot(
        &mut self,
        container: ComponentId,
        index: i32,
        child: Option<ComponentId>,
    ) -> Option<ComponentId> {
        let previous = self
            .nodes
            .get_mut(&container)
            .and_then(Component::as_container_mut)
            .and_then(|c| c.set_slot(index, child));
        if let Some(previous) = previous {
            self.parents.remove(&previous);
        }
        if let Some(child) = child {
            self.parents.insert(child, container);
        }
        self.emit(GraphEvent::SlotChanged { container, index });
        previous
    }

    /// Re-establish parent links for the whole subtree below `container`.
    fn relink(&mut self, container: ComponentId) {
        let mut stack = vec![container];
        while let Some(parent) = stack.pop() {
            let Some(children) = self.container(parent).map(|c| c.children().clone()) else {
                continue;
            };
            for child in children.into_values() {
                self.parents.insert(child, parent);
                stack.push(child);
            }
        }
    }

    /// Emit a close request for the owning window if `container` is empty
    /// under the no-empty-container policy and not mid-reload.
    fn check_empty(&mut self, container: ComponentId) {
        if !self.no_empty_container {
            return;
        }
        let Some(component) = self.get(container) else {
            return;
        };
        let empty = component.as_container().is_some_and(Container::is_empty);
        if !empty || component.properties.contains_key(RELOADING_PROPERTY) {
            return;
        }
        let root = self.root_of(container);
        let host = self.host_of(root);
        self.emit(GraphEvent::WindowCloseRequested { host, root });
    }

    /// Clear `child`'s slot and close it. Returns `false` if `child` is not
    /// in `container`.
    pub fn remove_child(&mut self, container: ComponentId, child: ComponentId) -> bool {
        let Some(index) = self.container(container).and_then(|c| c.index_of(child)) else {
            return false;
        };
        self.add_child(container, Some(index), None);
        self.close(child);
        true
    }

    /// Exchange `self_container[index]` with `other_component` in
    /// `other_container`.
    pub fn swap_children(
        &mut self,
        self_container: ComponentId,
        index: i32,
        other_container: ComponentId,
        other_component: ComponentId,
    ) {
        self.ui.assert_current("swap_children");
        let Some(other_index) = self
            .container(other_container)
            .and_then(|c| c.index_of(other_component))
        else {
            return;
        };
        let mine = self.container(self_container).and_then(|c| c.child(index));

        self.set_child(self_container, Some(index), Some(other_component));
        if self_container != other_container || other_index != index {
            self.set_child(other_container, Some(other_index), mine);
        }

        self.check_empty(self_container);
        if other_container != self_container {
            self.check_empty(other_container);
        }
    }

    // ========================================================================
    // Roots
    // ========================================================================

    /// Make `root` the top-level component of `host`. The previous root is
    /// detached and returned.
    pub fn attach_root(&mut self, host: HostId, root: ComponentId) -> Option<ComponentId> {
        self.ui.assert_current("attach_root");
        assert!(self.contains(root), "component {root} is not in the graph");
        if let Some(parent) = self.parent_of(root)
            && let Some(index) = self.container(parent).and_then(|c| c.index_of(root))
        {
            self.add_child(parent, Some(index), None);
        }
        self.hosts.retain(|_, id| *id != root);
        let previous = self.hosts.insert(host, root);
        self.relink(root);
        self.refresh_locks(root);
        previous.filter(|p| *p != root)
    }

    /// Swap the node behind a root id in place, keeping its host slot, and
    /// close the old node.
    ///
    /// # Panics
    ///
    /// If `id` has a parent or `replacement.id != id`.
    pub fn replace_root(&mut self, replacement: Component) {
        self.ui.assert_current("replace_root");
        let id = replacement.id;
        assert!(self.parent_of(id).is_none(), "component {id} is not a root");

        let children: Vec<_> = self
            .container(id)
            .map(|c| c.children().values().copied().collect())
            .unwrap_or_default();
        for child in children {
            self.close(child);
        }
        if let Some(mut old) = self.nodes.remove(&id) {
            self.close_node(&mut old);
        }
        self.insert(replacement);
        self.refresh_locks(id);

        if let Some(host) = self.host_of(id) {
            self.emit(GraphEvent::RootReplaced { host, id });
        }
    }

    // ========================================================================
    // Closing
    // ========================================================================

    /// Close a component and its descendants, detach it and drop it from
    /// the arena.
    pub fn close(&mut self, id: ComponentId) {
        self.ui.assert_current("close");
        if !self.contains(id) {
            return;
        }
        if let Some(parent) = self.parent_of(id)
            && let Some(index) = self.container(parent).and_then(|c| c.index_of(id))
        {
            self.write_slot(parent, index, None);
        }
        self.hosts.retain(|_, root| *root != id);

        let subtree = self.descendants(id);
        for node in subtree.into_iter().rev() {
            self.parents.remove(&node);
            if let Some(mut component) = self.nodes.remove(&node) {
                self.close_node(&mut component);
            }
        }
    }

    fn close_node(&mut self, component: &mut Component) {
        if let ComponentKind::Widget(widget) = &mut component.kind
            && widget.close_controller()
        {
            self.live.decrement(&widget.factory_id);
        }
        self.emit(GraphEvent::Closed { id: component.id });
    }

    /// Place the child at `index` of a free-form container. Returns `false`
    /// for other layouts or an index outside the domain.
    pub fn set_free_form_box(&mut self, container: ComponentId, index: i32, placement: FreeFormBox) -> bool {
        self.ui.assert_current("set_free_form_box");
        let Some(target) = self.get_mut(container).and_then(|c| c.as_container_mut()) else {
            return false;
        };
        if !target.set_free_form_box(index, placement) {
            return false;
        }
        if target.child(index).is_some() {
            self.emit(GraphEvent::SlotChanged { container, index });
        }
        true
    }

    // ========================================================================
    // Locks
    // ========================================================================

    pub fn set_locked(&mut self, id: ComponentId, locked: bool) {
        let Some(component) = self.get_mut(id) else {
            return;
        };
        component.locked = locked;
        self.refresh_locks(id);
    }

    pub fn set_global_lock(&mut self, locked: bool) {
        self.ui.assert_current("set_global_lock");
        self.global_lock = locked;
        let tops: Vec<_> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !self.parents.contains_key(id))
            .collect();
        for top in tops {
            self.refresh_locks(top);
        }
    }

    pub fn is_global_lock(&self) -> bool {
        self.global_lock
    }

    pub fn is_locked_effective(&self, id: ComponentId) -> bool {
        self.get(id).is_some_and(Component::is_locked_effective)
    }

    /// Recompute effective locks below (and including) `id`.
    fn refresh_locks(&mut self, id: ComponentId) {
        let inherited = self.global_lock
            || self
                .parent_of(id)
                .is_some_and(|p| self.is_locked_effective(p));

        let mut stack = vec![(id, inherited)];
        while let Some((node, inherited)) = stack.pop() {
            let Some(component) = self.nodes.get_mut(&node) else {
                continue;
            };
            let effective = inherited || component.locked;
            let flipped = component.locked_effective != effective;
            component.locked_effective = effective;
            if let Some(container) = component.as_container() {
                stack.extend(container.children().values().map(|c| (*c, effective)));
            }
            if flipped {
                self.emit(GraphEvent::LockChanged {
                    id: node,
                    locked: effective,
                });
            }
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("hosts", &self.hosts)
            .field("global_lock", &self.global_lock)
            .finish()
    }
}
