//! Persisted form of the component graph.
//!
//! ```json
//! {
//!   "type": "Bi",
//!   "id": "6f1c…",
//!   "loading": "AUTOMATIC",
//!   "locked": false,
//!   "orientation": "VERTICAL",
//!   "position": 0.3,
//!   "children": {
//!     "1": { "type": "Widget", "id": "…", "factoryId": "Clock", "nameUi": "Clock", "settings": {} }
//!   },
//!   "properties": {}
//! }
//! ```
//!
//! Widget input bindings are stored as `io:<input>` properties holding
//! `output,uuid` pairs joined by `:`.

mod convert;
mod dedup;
mod index_map;
mod io;

#[cfg(test)]
mod tests;

pub use convert::{to_domain, to_record};
pub use dedup::deduplicate_ids;
pub use io::{from_json, load_launcher, parse_launcher, read_layout, to_json, write_layout};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::Settings;
use crate::factory::FactoryId;
use crate::graph::{ComponentId, FreeFormBox, LoadType, Orientation, Properties};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("duplicate component id `{0}`")]
    DuplicateId(ComponentId),

    #[error("child index {index} is outside the {layout} container domain")]
    InvalidIndex { layout: &'static str, index: i32 },

    #[error("component `{0}` is not in the graph")]
    Unknown(ComponentId),

    #[error("invalid layout")]
    Json(#[from] serde_json::Error),

    #[error("failed to access `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

/// Serialized component, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComponentRecord {
    /// Empty slot or empty layout.
    None,
    Uni(UniRecord),
    Bi(BiRecord),
    Seq(SeqRecord),
    FreeForm(FreeFormRecord),
    Switch(SwitchRecord),
    Widget(WidgetRecord),
}

type Children = BTreeMap<i32, ComponentRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniRecord {
    pub id: ComponentId,
    #[serde(default)]
    pub loading: LoadType,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, with = "index_map")]
    pub children: Children,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiRecord {
    pub id: ComponentId,
    #[serde(default)]
    pub loading: LoadType,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "half")]
    pub position: f64,
    #[serde(default)]
    pub collapsed: Option<i32>,
    #[serde(default)]
    pub absolute_size: Option<i32>,
    #[serde(default)]
    pub joined: bool,
    #[serde(default, with = "index_map")]
    pub children: Children,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeqRecord {
    pub id: ComponentId,
    #[serde(default)]
    pub loading: LoadType,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default, with = "index_map")]
    pub children: Children,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeFormRecord {
    pub id: ComponentId,
    #[serde(default)]
    pub loading: LoadType,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, with = "index_map")]
    pub boxes: BTreeMap<i32, FreeFormBox>,
    #[serde(default, with = "index_map")]
    pub children: Children,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchRecord {
    pub id: ComponentId,
    #[serde(default)]
    pub loading: LoadType,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub translate: f64,
    #[serde(default = "yes")]
    pub snap: bool,
    #[serde(default = "one")]
    pub zoom: f64,
    #[serde(default, with = "index_map")]
    pub children: Children,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRecord {
    pub id: ComponentId,
    #[serde(default)]
    pub loading: LoadType,
    #[serde(default)]
    pub locked: bool,
    pub factory_id: FactoryId,
    #[serde(default)]
    pub name_ui: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub properties: Properties,
}

impl WidgetRecord {
    /// Fresh widget record for `factory_id`.
    pub fn new(factory_id: FactoryId) -> Self {
        Self {
            id: ComponentId::new(),
            loading: LoadType::default(),
            locked: false,
            factory_id,
            name_ui: String::new(),
            settings: Settings::new(),
            properties: Properties::new(),
        }
    }
}

fn half() -> f64 {
    0.5
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

impl ComponentRecord {
    pub fn id(&self) -> Option<ComponentId> {
        match self {
            Self::None => None,
            Self::Uni(r) => Some(r.id),
            Self::Bi(r) => Some(r.id),
            Self::Seq(r) => Some(r.id),
            Self::FreeForm(r) => Some(r.id),
            Self::Switch(r) => Some(r.id),
            Self::Widget(r) => Some(r.id),
        }
    }

    pub fn id_mut(&mut self) -> Option<&mut ComponentId> {
        match self {
            Self::None => None,
            Self::Uni(r) => Some(&mut r.id),
            Self::Bi(r) => Some(&mut r.id),
            Self::Seq(r) => Some(&mut r.id),
            Self::FreeForm(r) => Some(&mut r.id),
            Self::Switch(r) => Some(&mut r.id),
            Self::Widget(r) => Some(&mut r.id),
        }
    }

    pub fn properties_mut(&mut self) -> Option<&mut Properties> {
        match self {
            Self::None => None,
            Self::Uni(r) => Some(&mut r.properties),
            Self::Bi(r) => Some(&mut r.properties),
            Self::Seq(r) => Some(&mut r.properties),
            Self::FreeForm(r) => Some(&mut r.properties),
            Self::Switch(r) => Some(&mut r.properties),
            Self::Widget(r) => Some(&mut r.properties),
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<i32, ComponentRecord>> {
        match self {
            Self::Uni(r) => Some(&r.children),
            Self::Bi(r) => Some(&r.children),
            Self::Seq(r) => Some(&r.children),
            Self::FreeForm(r) => Some(&r.children),
            Self::Switch(r) => Some(&r.children),
            Self::None | Self::Widget(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<i32, ComponentRecord>> {
        match self {
            Self::Uni(r) => Some(&mut r.children),
            Self::Bi(r) => Some(&mut r.children),
            Self::Seq(r) => Some(&mut r.children),
            Self::FreeForm(r) => Some(&mut r.children),
            Self::Switch(r) => Some(&mut r.children),
            Self::None | Self::Widget(_) => None,
        }
    }

    /// Pre-order walk.
    pub fn visit(&self, f: &mut impl FnMut(&ComponentRecord)) {
        f(self);
        if let Some(children) = self.children() {
            for child in children.values() {
                child.visit(f);
            }
        }
    }

    /// Pre-order walk with mutable access.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut ComponentRecord)) {
        f(self);
        if let Some(children) = self.children_mut() {
            for child in children.values_mut() {
                child.visit_mut(f);
            }
        }
    }

    /// Every id in the subtree, in walk order (duplicates kept).
    pub fn ids(&self) -> Vec<ComponentId> {
        let mut ids = Vec::new();
        self.visit(&mut |r| ids.extend(r.id()));
        ids
    }
}
