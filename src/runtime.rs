//! UI context: owns the graph and the factory registry.
//!
//! Background work (watcher, build workers) never touches either directly.
//! It sends [`UiMsg`]s through a cloneable [`UiHandle`]; the UI thread
//! applies them in [`Runtime::pump`] or [`Runtime::run`].

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::LayoutConfig;
use crate::core::ShutdownSignal;
use crate::error::ErrorLog;
use crate::factory::{
    ComponentFactory, FactoryError, FactoryId, FactoryRegistry, LiveInstances, Registration,
    WidgetFactory,
};
use crate::graph::{ComponentId, Graph, GraphEvent, HostId, LoadOutcome, LoadType};
use crate::record::{self, RecordError};
use crate::swap::{SwapReport, hot_swap};
use crate::{debug, log};

/// Message marshaled onto the UI thread.
#[derive(Debug)]
pub enum UiMsg {
    RegisterFactory(Arc<WidgetFactory>),
    UnregisterFactory(FactoryId),
    /// Only the stylesheet of a widget directory changed.
    SkinChanged {
        factory: FactoryId,
        stylesheet: PathBuf,
    },
    Shutdown,
}

/// Sending half of the UI queue. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct UiHandle {
    tx: Sender<UiMsg>,
}

impl UiHandle {
    /// A detached handle and its receiving end.
    pub fn channel() -> (Self, Receiver<UiMsg>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }

    /// Queue a message. Returns `false` once the UI side is gone.
    pub fn send(&self, msg: UiMsg) -> bool {
        self.tx.send(msg).is_ok()
    }
}

pub struct Runtime {
    graph: Graph,
    registry: FactoryRegistry,
    errors: ErrorLog,
    handle: UiHandle,
    rx: Receiver<UiMsg>,
}

impl Runtime {
    /// Runtime owned by the calling thread.
    pub fn new(policy: &LayoutConfig, errors: ErrorLog) -> Self {
        let (handle, rx) = UiHandle::channel();
        Self {
            graph: Graph::new(policy, LiveInstances::new()),
            registry: FactoryRegistry::new(),
            errors,
            handle,
            rx,
        }
    }

    pub fn handle(&self) -> UiHandle {
        self.handle.clone()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Live instance counts, shared with the build scheduler.
    pub fn live_instances(&self) -> LiveInstances {
        self.graph.live_instances().clone()
    }

    // ========================================================================
    // Factories
    // ========================================================================

    /// Register a factory and hot-swap live instances of its id.
    ///
    /// Placeholder instances (factory was missing) are swapped too, so a
    /// widget that appears on disk comes alive without a restart.
    pub fn register_factory(&mut self, factory: impl Into<ComponentFactory>) -> Option<SwapReport> {
        let factory = factory.into();
        let registration = self.registry.register(factory.clone());
        let widget = factory.as_widget()?;
        match registration {
            Registration::Unchanged => None,
            Registration::Added | Registration::Replaced(_) => {
                debug!("runtime"; "{} registered", widget.id());
                let report = hot_swap(&mut self.graph, widget, &self.errors);
                let loaded = self.load_pending(widget.id());
                if loaded > 0 {
                    debug!("runtime"; "{loaded} pending {} widgets loaded", widget.id());
                }
                Some(report)
            }
        }
    }

    /// Remove a factory. Its live instances keep running.
    pub fn unregister_factory(&mut self, id: &FactoryId) -> bool {
        self.registry.unregister(id).is_some()
    }

    /// Load automatic widgets of `factory` that are still waiting.
    fn load_pending(&mut self, factory: &FactoryId) -> usize {
        let pending: Vec<_> = self
            .graph
            .widgets()
            .into_iter()
            .filter(|id| {
                self.graph.get(*id).is_some_and(|c| {
                    c.load_type == LoadType::Automatic
                        && c.as_widget()
                            .is_some_and(|w| !w.is_loaded() && w.factory_id == *factory)
                })
            })
            .collect();
        pending
            .into_iter()
            .filter(|id| {
                self.graph.load_widget(*id, &self.registry, &self.errors)
                    == LoadOutcome::Loaded
            })
            .count()
    }

    /// Forward a stylesheet change to every live instance of `factory`.
    pub fn reload_skin(&mut self, factory: &FactoryId, stylesheet: &Path) -> usize {
        let ids = self.graph.live_widgets(factory);
        for id in &ids {
            if let Some(controller) = self.graph.widget_mut(*id).and_then(|w| w.controller_mut()) {
                controller.reload_skin(stylesheet);
            }
        }
        ids.len()
    }

    // ========================================================================
    // Message loop
    // ========================================================================

    fn handle_message(&mut self, msg: UiMsg) -> ControlFlow<()> {
        match msg {
            UiMsg::RegisterFactory(factory) => {
                self.register_factory(factory);
            }
            UiMsg::UnregisterFactory(id) => {
                if self.unregister_factory(&id) {
                    log!("runtime"; "factory {id} unregistered");
                }
            }
            UiMsg::SkinChanged { factory, stylesheet } => {
                let count = self.reload_skin(&factory, &stylesheet);
                debug!("runtime"; "skin of {factory} reloaded in {count} instances");
            }
            UiMsg::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Apply every queued message without blocking. Returns `false` once a
    /// shutdown message was seen.
    pub fn pump(&mut self) -> bool {
        while let Ok(msg) = self.rx.try_recv() {
            if self.handle_message(msg).is_break() {
                return false;
            }
        }
        true
    }

    /// Block on the UI queue until shutdown, logging graph events as they
    /// happen.
    pub fn run(&mut self, shutdown: &ShutdownSignal) {
        let rx = self.rx.clone();
        loop {
            channel::select! {
                recv(rx) -> msg => {
                    let Ok(msg) = msg else { break };
                    if self.handle_message(msg).is_break() {
                        break;
                    }
                }
                recv(shutdown) -> _ => break,
            }
            self.process_events();
        }
        self.registry.dispose_all();
    }

    /// Log drained graph events. A close request closes the window's root,
    /// since there is no window system to ask. Detached subtrees have no
    /// window and are left alone.
    pub fn process_events(&mut self) -> Vec<GraphEvent> {
        let mut handled = Vec::new();
        loop {
            let events = self.graph.drain_events();
            if events.is_empty() {
                return handled;
            }
            for event in &events {
                match event {
                    GraphEvent::WindowCloseRequested { host: Some(host), root } => {
                        log!("runtime"; "closing {host} (last component left)");
                        self.graph.close(*root);
                    }
                    GraphEvent::WidgetReplaced { id, factory } => {
                        log!("runtime"; "{id} reloaded with new {factory}");
                    }
                    other => debug!("runtime"; "{:?}", other),
                }
            }
            handled.extend(events);
        }
    }

    // ========================================================================
    // Layouts
    // ========================================================================

    /// Read a layout file, attach it to `host` and load its automatic
    /// widgets. `Ok(None)` for an empty layout.
    pub fn load_layout(
        &mut self,
        path: &Path,
        host: HostId,
    ) -> Result<Option<ComponentId>, RecordError> {
        let record = record::read_layout(path)?;
        let Some(root) = record::to_domain(&mut self.graph, &record)? else {
            return Ok(None);
        };
        if let Some(previous) = self.graph.attach_root(host, root) {
            self.graph.close(previous);
        }
        let loaded = self.graph.load_all(&self.registry, &self.errors);
        log!("runtime"; "{} loaded into {host}, {loaded} widgets started", path.display());
        Ok(Some(root))
    }

    /// Persist the layout of `host`. Returns `false` if the host is empty.
    pub fn save_layout(&self, host: HostId, path: &Path) -> Result<bool, RecordError> {
        let Some(root) = self.graph.root_at(host) else {
            return Ok(false);
        };
        let record = record::to_record(&self.graph, root)?;
        record::write_layout(path, &record)?;
        Ok(true)
    }

    /// Create a component from a factory and, if given, place it in the
    /// first empty slot of `container`. Unknown ids produce a placeholder
    /// widget.
    pub async fn spawn_component(
        &mut self,
        factory: &FactoryId,
        container: Option<ComponentId>,
    ) -> Result<Option<ComponentId>, FactoryError> {
        let record = self.registry.get_or_placeholder(factory).create().await?;
        let Some(id) = record::to_domain(&mut self.graph, &record)? else {
            return Ok(None);
        };

        if let Some(container) = container
            && let Some(index) = self.graph.container(container).and_then(|c| c.first_empty_index())
        {
            self.graph.add_child(container, Some(index), Some(id));
        }

        for node in self.graph.descendants(id) {
            let automatic = self
                .graph
                .get(node)
                .is_some_and(|c| c.load_type == LoadType::Automatic);
            if automatic {
                self.graph.load_widget(node, &self.registry, &self.errors);
            }
        }
        Ok(Some(id))
    }
}
