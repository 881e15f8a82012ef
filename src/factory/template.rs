//! Factories producing prebuilt subtrees instead of a single widget.

use std::path::PathBuf;

use super::{FactoryError, FactoryId};
use crate::record::{ComponentRecord, WidgetRecord, deduplicate_ids, parse_launcher};

/// In-memory subtree, instantiated with fresh ids on every `create`.
#[derive(Debug, Clone)]
pub struct TemplateFactory {
    pub id: FactoryId,
    pub name: String,
    pub record: ComponentRecord,
}

impl TemplateFactory {
    pub fn create(&self) -> ComponentRecord {
        let mut record = self.record.clone();
        deduplicate_ids(&mut record);
        record
    }
}

/// Launcher file on disk, read on every `create`.
#[derive(Debug, Clone)]
pub struct FileFactory {
    pub id: FactoryId,
    pub name: String,
    pub path: PathBuf,
}

impl FileFactory {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: FactoryId::new(format!("file:{}", path.display())),
            name,
            path,
        }
    }

    pub async fn create(&self) -> Result<ComponentRecord, FactoryError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FactoryError::Io(self.path.clone(), e))?;
        Ok(parse_launcher(&content)?)
    }
}

/// Stands in for a factory id nothing is registered under. Creates a
/// widget that will show the placeholder controller.
#[derive(Debug, Clone)]
pub struct NoFactoryPlaceholder {
    pub id: FactoryId,
}

impl NoFactoryPlaceholder {
    pub fn create(&self) -> ComponentRecord {
        ComponentRecord::Widget(WidgetRecord::new(self.id.clone()))
    }
}
