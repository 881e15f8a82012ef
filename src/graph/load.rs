//! Lazy controller creation.

use super::{ComponentId, Graph, GraphEvent, WidgetStatus};
use crate::controller::{Controller, ControllerInit, ErrorController, NoFactoryController};
use crate::error::{AppError, ErrorLog};
use crate::factory::FactoryRegistry;

/// Result of [`Graph::load_widget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    AlreadyLoaded,
    /// Placeholder controller installed.
    NoFactory,
    /// Error controller installed.
    Failed(String),
    NotAWidget,
}

impl Graph {
    /// Create the widget's controller if it has none.
    ///
    /// Never fails: a missing factory installs a placeholder, a failing
    /// constructor installs an error controller. Both are reported to
    /// `errors` and keep the widget's settings.
    pub fn load_widget(
        &mut self,
        id: ComponentId,
        registry: &FactoryRegistry,
        errors: &ErrorLog,
    ) -> LoadOutcome {
        self.ui.assert_current("load_widget");
        let Some(widget) = self.widget(id) else {
            return LoadOutcome::NotAWidget;
        };
        if widget.is_loaded() {
            return LoadOutcome::AlreadyLoaded;
        }
        let factory_id = widget.factory_id.clone();
        let settings = widget.fields.clone();

        let (controller, status, outcome) =
            match registry.widget_factory(&factory_id) {
                None => {
                    let placeholder = NoFactoryController::new(factory_id.as_str(), settings);
                    errors.push(AppError::new(format!("widget:{id}"), placeholder.message()));
                    (
                        Box::new(placeholder) as Box<dyn Controller>,
                        WidgetStatus::NoFactory,
                        LoadOutcome::NoFactory,
                    )
                }
                Some(factory) => {
                    let restoring = !settings.is_empty();
                    match factory.instantiate(ControllerInit {
                        settings: settings.clone(),
                        restoring,
                    }) {
                        Ok(controller) => (controller, WidgetStatus::Loaded, LoadOutcome::Loaded),
                        Err(err) => {
                            errors.report(format!("widget:{factory_id}"), &err);
                            let message = err.to_string();
                            (
                                Box::new(ErrorController::new(
                                    factory_id.as_str(),
                                    message.clone(),
                                    settings,
                                )) as Box<dyn Controller>,
                                WidgetStatus::Failed(message.clone()),
                                LoadOutcome::Failed(message),
                            )
                        }
                    }
                }
            };

        let inputs = controller.inputs();
        let outputs = controller.outputs();
        let Some(widget) = self.widget_mut(id) else {
            return LoadOutcome::NotAWidget;
        };
        widget.declare_ports(&inputs, &outputs);
        widget.controller = Some(controller);
        widget.status = status;
        let values = widget.input_values();
        if let Some(controller) = widget.controller.as_deref_mut() {
            for (name, value) in &values {
                controller.set_input(name, value);
            }
        }

        self.live.increment(&factory_id);
        self.emit(GraphEvent::WidgetLoaded {
            id,
            factory: factory_id,
        });
        outcome
    }

    /// Load every unloaded widget with [`LoadType::Automatic`](super::LoadType).
    pub fn load_all(&mut self, registry: &FactoryRegistry, errors: &ErrorLog) -> usize {
        let pending: Vec<_> = self
            .widgets()
            .into_iter()
            .filter(|id| {
                self.get(*id).is_some_and(|c| {
                    c.load_type == super::LoadType::Automatic
                        && c.as_widget().is_some_and(|w| !w.is_loaded())
                })
            })
            .collect();
        pending
            .into_iter()
            .filter(|id| self.load_widget(*id, registry, errors) == LoadOutcome::Loaded)
            .count()
    }
}
