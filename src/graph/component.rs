use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Container, Widget};

/// String-keyed property bag that survives serialization.
pub type Properties = BTreeMap<String, Value>;

/// Transient marker set on a parent while one of its children is hot-swapped.
pub const RELOADING_PROPERTY: &str = "reloading";

/// Identity of a component, immutable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(Uuid);

impl ComponentId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ComponentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// When a widget's controller is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadType {
    /// As soon as the widget is shown.
    #[default]
    Automatic,
    /// Only when the user asks for it.
    Manual,
}

#[derive(Debug)]
pub enum ComponentKind {
    Container(Container),
    Widget(Widget),
}

/// A node of the component graph.
#[derive(Debug)]
pub struct Component {
    pub id: ComponentId,
    pub properties: Properties,
    pub load_type: LoadType,
    /// Local lock flag.
    pub locked: bool,
    /// Derived: self, an ancestor or the global flag. Maintained by the graph.
    pub(super) locked_effective: bool,
    pub kind: ComponentKind,
}

impl Component {
    pub fn new(id: ComponentId, kind: ComponentKind) -> Self {
        Self {
            id,
            properties: Properties::new(),
            load_type: LoadType::default(),
            locked: false,
            locked_effective: false,
            kind,
        }
    }

    pub fn container(container: Container) -> Self {
        Self::new(ComponentId::new(), ComponentKind::Container(container))
    }

    pub fn widget(widget: Widget) -> Self {
        Self::new(ComponentId::new(), ComponentKind::Widget(widget))
    }

    pub fn is_locked_effective(&self) -> bool {
        self.locked_effective
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.kind {
            ComponentKind::Container(c) => Some(c),
            ComponentKind::Widget(_) => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut Container> {
        match &mut self.kind {
            ComponentKind::Container(c) => Some(c),
            ComponentKind::Widget(_) => None,
        }
    }

    pub fn as_widget(&self) -> Option<&Widget> {
        match &self.kind {
            ComponentKind::Widget(w) => Some(w),
            ComponentKind::Container(_) => None,
        }
    }

    pub fn as_widget_mut(&mut self) -> Option<&mut Widget> {
        match &mut self.kind {
            ComponentKind::Widget(w) => Some(w),
            ComponentKind::Container(_) => None,
        }
    }
}
