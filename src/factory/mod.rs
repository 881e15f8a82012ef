//! Component factories and the registry the UI picks them from.

mod id;
mod live;
mod registry;
mod template;
mod widget;

pub use id::FactoryId;
pub use live::LiveInstances;
pub use registry::{FactoryRegistry, Registration};
pub use template::{FileFactory, NoFactoryPlaceholder, TemplateFactory};
pub use widget::WidgetFactory;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::record::{ComponentRecord, RecordError, WidgetRecord};

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("no factory registered for `{0}`")]
    Missing(FactoryId),

    #[error("failed to read launcher `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Anything that can produce a component subtree.
#[derive(Debug, Clone)]
pub enum ComponentFactory {
    Widget(Arc<WidgetFactory>),
    Template(Arc<TemplateFactory>),
    FileBacked(Arc<FileFactory>),
    NoFactory(NoFactoryPlaceholder),
}

impl ComponentFactory {
    pub fn id(&self) -> &FactoryId {
        match self {
            Self::Widget(f) => f.id(),
            Self::Template(f) => &f.id,
            Self::FileBacked(f) => &f.id,
            Self::NoFactory(f) => &f.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Widget(f) => f.name(),
            Self::Template(f) => &f.name,
            Self::FileBacked(f) => &f.name,
            Self::NoFactory(f) => f.id.as_str(),
        }
    }

    pub fn as_widget(&self) -> Option<&Arc<WidgetFactory>> {
        match self {
            Self::Widget(f) => Some(f),
            _ => None,
        }
    }

    /// A fresh, detached subtree with ids unique to this call.
    pub async fn create(&self) -> Result<ComponentRecord, FactoryError> {
        match self {
            Self::Widget(f) => {
                let mut record = WidgetRecord::new(f.id().clone());
                record.name_ui = f.name().to_string();
                Ok(ComponentRecord::Widget(record))
            }
            Self::Template(f) => Ok(f.create()),
            Self::FileBacked(f) => f.create().await,
            Self::NoFactory(f) => Ok(f.create()),
        }
    }
}

impl From<Arc<WidgetFactory>> for ComponentFactory {
    fn from(factory: Arc<WidgetFactory>) -> Self {
        Self::Widget(factory)
    }
}

impl From<WidgetFactory> for ComponentFactory {
    fn from(factory: WidgetFactory) -> Self {
        Self::Widget(Arc::new(factory))
    }
}

impl From<TemplateFactory> for ComponentFactory {
    fn from(factory: TemplateFactory) -> Self {
        Self::Template(Arc::new(factory))
    }
}

impl From<FileFactory> for ComponentFactory {
    fn from(factory: FileFactory) -> Self {
        Self::FileBacked(Arc::new(factory))
    }
}
