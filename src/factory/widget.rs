//! Widget factory: a resolved controller type plus its metadata.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use super::FactoryId;
use crate::controller::{Controller, ControllerError, ControllerInit, ControllerType, WidgetInfo};

const NEW: u8 = 0;
const INITIALIZED: u8 = 1;
const DISPOSED: u8 = 2;

pub struct WidgetFactory {
    id: FactoryId,
    controller_type: Arc<dyn ControllerType>,
    info: WidgetInfo,
    /// Widget directory this factory was built from, if any.
    source_dir: Option<PathBuf>,
    lifecycle: AtomicU8,
}

impl WidgetFactory {
    /// Factory with the default id (the controller's simple type name).
    pub fn new(controller_type: Arc<dyn ControllerType>) -> Self {
        let info = controller_type.info();
        Self {
            id: FactoryId::new(controller_type.type_name()),
            controller_type,
            info,
            source_dir: None,
            lifecycle: AtomicU8::new(NEW),
        }
    }

    /// Pin the id.
    pub fn with_id(mut self, id: impl Into<FactoryId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_source_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.source_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn id(&self) -> &FactoryId {
        &self.id
    }

    pub fn name(&self) -> &str {
        if self.info.name.is_empty() {
            self.id.as_str()
        } else {
            &self.info.name
        }
    }

    pub fn info(&self) -> &WidgetInfo {
        &self.info
    }

    pub fn version(&self) -> &str {
        &self.info.version
    }

    pub fn author(&self) -> &str {
        &self.info.author
    }

    pub fn description(&self) -> &str {
        &self.info.description
    }

    pub fn is_preferred(&self) -> bool {
        self.info.preferred
    }

    pub fn is_ignored(&self) -> bool {
        self.info.ignored
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn controller_type(&self) -> &Arc<dyn ControllerType> {
        &self.controller_type
    }

    /// Run the type's init hook. Only the first call has an effect.
    pub fn init(&self) {
        if self
            .lifecycle
            .compare_exchange(NEW, INITIALIZED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.controller_type.init();
        }
    }

    /// Run the type's dispose hook if it was initialized. Only the first
    /// call has an effect.
    pub fn dispose(&self) {
        if self.lifecycle.swap(DISPOSED, Ordering::SeqCst) == INITIALIZED {
            self.controller_type.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.load(Ordering::SeqCst) == DISPOSED
    }

    /// Create a controller. A panicking constructor becomes an error.
    pub fn instantiate(&self, init: ControllerInit) -> Result<Box<dyn Controller>, ControllerError> {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.controller_type.instantiate(init)
        }))
        .unwrap_or_else(|payload| {
            Err(ControllerError::Panicked {
                type_name: self.controller_type.type_name().to_string(),
                message: panic_message(payload.as_ref()),
            })
        })
    }
}

impl fmt::Debug for WidgetFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetFactory")
            .field("id", &self.id)
            .field("type", &self.controller_type.type_name())
            .field("source_dir", &self.source_dir)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
