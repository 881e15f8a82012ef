//! Factory registry owned by the UI thread.

use std::sync::Arc;

use crossbeam::channel::Receiver;
use rustc_hash::FxHashMap;

use super::{ComponentFactory, FactoryError, FactoryId, NoFactoryPlaceholder, WidgetFactory};
use crate::core::{ListChange, ObservableList, UiThread};
use crate::{debug, log};

/// Outcome of [`FactoryRegistry::register`].
#[derive(Debug, Clone)]
pub enum Registration {
    Added,
    /// A factory with the same id was unregistered and disposed first.
    Replaced(ComponentFactory),
    /// The exact same factory was already registered.
    Unchanged,
}

pub struct FactoryRegistry {
    factories: FxHashMap<FactoryId, ComponentFactory>,
    list: ObservableList<ComponentFactory>,
    ui: UiThread,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
            list: ObservableList::new(),
            ui: UiThread::current(),
        }
    }

    /// Add a factory, superseding any factory with the same id.
    ///
    /// Widget factories are initialized on the way in and disposed on the
    /// way out. Hot-swapping live instances is the caller's follow-up.
    pub fn register(&mut self, factory: impl Into<ComponentFactory>) -> Registration {
        self.ui.assert_current("register");
        let factory = factory.into();
        let id = factory.id().clone();

        if let (Some(ComponentFactory::Widget(existing)), ComponentFactory::Widget(new)) =
            (self.factories.get(&id), &factory)
            && Arc::ptr_eq(existing, new)
        {
            return Registration::Unchanged;
        }

        let previous = self.unregister(&id);
        if let ComponentFactory::Widget(widget) = &factory {
            widget.init();
        }
        self.factories.insert(id.clone(), factory.clone());
        self.list.push(factory);

        match previous {
            Some(previous) => {
                log!("factory"; "replaced {}", id);
                Registration::Replaced(previous)
            }
            None => {
                debug!("factory"; "registered {}", id);
                Registration::Added
            }
        }
    }

    /// Remove and dispose a factory. Existing instances stay live.
    pub fn unregister(&mut self, id: &FactoryId) -> Option<ComponentFactory> {
        self.ui.assert_current("unregister");
        let removed = self.factories.remove(id)?;
        self.list.remove_where(|f| f.id() == id);
        if let ComponentFactory::Widget(widget) = &removed {
            widget.dispose();
        }
        Some(removed)
    }

    pub fn get(&self, id: &FactoryId) -> Result<ComponentFactory, FactoryError> {
        self.factories
            .get(id)
            .cloned()
            .ok_or_else(|| FactoryError::Missing(id.clone()))
    }

    /// Registered factory, or a placeholder that creates a factory-less widget.
    pub fn get_or_placeholder(&self, id: &FactoryId) -> ComponentFactory {
        self.get(id).unwrap_or_else(|_| {
            ComponentFactory::NoFactory(NoFactoryPlaceholder { id: id.clone() })
        })
    }

    pub fn widget_factory(&self, id: &FactoryId) -> Option<Arc<WidgetFactory>> {
        self.factories.get(id)?.as_widget().cloned()
    }

    pub fn contains(&self, id: &FactoryId) -> bool {
        self.factories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Read-only view in registration order.
    pub fn factories(&self) -> Vec<ComponentFactory> {
        self.list.snapshot()
    }

    /// Visible widget factories, preferred first, then by name.
    pub fn pickable(&self) -> Vec<Arc<WidgetFactory>> {
        let mut widgets: Vec<_> = self
            .factories
            .values()
            .filter_map(|f| f.as_widget().cloned())
            .filter(|f| !f.is_ignored())
            .collect();
        widgets.sort_by(|a, b| {
            b.is_preferred()
                .cmp(&a.is_preferred())
                .then_with(|| a.name().cmp(b.name()))
        });
        widgets
    }

    pub fn subscribe(&self) -> Receiver<ListChange<ComponentFactory>> {
        self.list.subscribe()
    }

    /// Unregister everything.
    pub fn dispose_all(&mut self) {
        let ids: Vec<_> = self.factories.keys().cloned().collect();
        for id in ids {
            self.unregister(&id);
        }
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
