//! Native widget modules loaded with `libloading`.
//!
//! A native widget is a `cdylib` exporting one C-ABI entry point:
//!
//! ```ignore
//! #[unsafe(no_mangle)]
//! pub extern "C" fn quaver_controller_v1() -> *const NativeControllerV1 { &DESCRIPTOR }
//! ```
//!
//! The descriptor and every string it points to must live in the library's
//! static data. Settings, port lists and input values cross the boundary as
//! JSON strings.

use std::ffi::{CStr, CString, c_char, c_void};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use serde::Deserialize;
use serde_json::Value;

use super::{DynamicModule, ModuleError, ModuleLoader, ModuleScope};
use crate::controller::{
    Controller, ControllerError, ControllerInit, ControllerType, PortSpec, Settings, WidgetInfo,
};
use crate::debug;

/// Descriptor layout version understood by this host.
pub const ABI_VERSION: u32 = 1;

/// Exported entry point, nul-terminated for `libloading`.
pub const ENTRY_SYMBOL: &[u8] = b"quaver_controller_v1\0";

/// C-ABI controller descriptor exported by native widgets.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct NativeControllerV1 {
    pub abi_version: u32,
    pub type_name: *const c_char,
    pub version: *const c_char,
    pub author: *const c_char,
    pub description: *const c_char,
    /// JSON `{"inputs": [{"name", "type"}], "outputs": [...]}`, may be null.
    pub ports: *const c_char,
    pub create: unsafe extern "C" fn(settings_json: *const c_char, restoring: bool) -> *mut c_void,
    pub destroy: unsafe extern "C" fn(instance: *mut c_void),
    /// Returns an owned JSON object string released with `free_string`.
    pub settings: unsafe extern "C" fn(instance: *mut c_void) -> *mut c_char,
    pub set_input:
        unsafe extern "C" fn(instance: *mut c_void, name: *const c_char, value_json: *const c_char),
    pub free_string: unsafe extern "C" fn(value: *mut c_char),
}

type EntryFn = unsafe extern "C" fn() -> *const NativeControllerV1;

#[derive(Debug, Clone, Default, Deserialize)]
struct NativePorts {
    #[serde(default)]
    inputs: Vec<PortSpec>,
    #[serde(default)]
    outputs: Vec<PortSpec>,
}

// ============================================================================
// Loader
// ============================================================================

/// Loads the shared library found in a widget's output directory.
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    fn load(&self, scope: &ModuleScope) -> Result<Arc<dyn DynamicModule>, ModuleError> {
        // Per-widget libraries first so the artifact's dynamic deps resolve.
        let dependencies = scope
            .libraries
            .iter()
            .filter(|path| is_native_library(path))
            .map(|path| open(path))
            .collect::<Result<Vec<_>, _>>()?;

        let path = find_artifact(&scope.output_dir)?;
        let library = open(&path)?;
        debug!("module"; "loaded {}", path.display());

        Ok(Arc::new(NativeModule {
            inner: Arc::new(LoadedLibrary {
                library,
                _dependencies: dependencies,
                path,
            }),
        }))
    }
}

/// Field order matters: the artifact unloads before its dependencies.
struct LoadedLibrary {
    library: Library,
    _dependencies: Vec<Library>,
    path: PathBuf,
}

impl Drop for LoadedLibrary {
    fn drop(&mut self) {
        debug!("module"; "unloading {}", self.path.display());
    }
}

fn open(path: &Path) -> Result<Library, ModuleError> {
    // SAFETY: loading runs library initializers; widget libraries are built
    // from the user's own widget directory by the build pipeline.
    unsafe { Library::new(path) }.map_err(|e| ModuleError::Load {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

fn is_native_library(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
}

/// First shared library (by name) directly inside `output_dir`.
fn find_artifact(output_dir: &Path) -> Result<PathBuf, ModuleError> {
    let entries = std::fs::read_dir(output_dir).map_err(|e| ModuleError::Load {
        path: output_dir.to_path_buf(),
        source: Box::new(e),
    })?;

    let mut candidates: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_native_library(path))
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModuleError::NoArtifact(output_dir.to_path_buf()))
}

/// Copy a C string owned by the library.
///
/// # Safety
/// `ptr` must be null or point to a nul-terminated string that outlives the call.
unsafe fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: guaranteed by caller.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

// ============================================================================
// Module
// ============================================================================

struct NativeModule {
    inner: Arc<LoadedLibrary>,
}

impl NativeModule {
    fn not_a_controller(name: &str, reason: impl Into<String>) -> ModuleError {
        ModuleError::NotAController {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl DynamicModule for NativeModule {
    fn resolve(&self, qualified_name: &str) -> Result<Arc<dyn ControllerType>, ModuleError> {
        // SAFETY: symbol type is fixed by the widget ABI.
        let entry: Symbol<EntryFn> = unsafe { self.inner.library.get(ENTRY_SYMBOL) }
            .map_err(|_| Self::not_a_controller(qualified_name, "missing quaver_controller_v1"))?;

        // SAFETY: entry takes no arguments and returns a static descriptor.
        let descriptor = unsafe { entry() };
        if descriptor.is_null() {
            return Err(Self::not_a_controller(qualified_name, "entry returned null"));
        }
        // SAFETY: non-null, points into the library's static data.
        let descriptor = unsafe { *descriptor };

        if descriptor.abi_version != ABI_VERSION {
            return Err(Self::not_a_controller(
                qualified_name,
                format!(
                    "ABI version {} (expected {ABI_VERSION})",
                    descriptor.abi_version
                ),
            ));
        }

        // SAFETY: descriptor strings are static for the library's lifetime.
        let type_name = unsafe { read_str(descriptor.type_name) }
            .ok_or_else(|| Self::not_a_controller(qualified_name, "missing type name"))?;

        let simple_name = qualified_name.rsplit('.').next().unwrap_or(qualified_name);
        if type_name != simple_name {
            return Err(ModuleError::NotFound(qualified_name.to_string()));
        }

        // SAFETY: as above.
        let (version, author, description, ports) = unsafe {
            (
                read_str(descriptor.version).unwrap_or_default(),
                read_str(descriptor.author).unwrap_or_default(),
                read_str(descriptor.description).unwrap_or_default(),
                read_str(descriptor.ports),
            )
        };
        let ports = match ports {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                Self::not_a_controller(qualified_name, format!("invalid port list: {e}"))
            })?,
            None => NativePorts::default(),
        };

        let info = WidgetInfo {
            name: type_name.clone(),
            version,
            author,
            description,
            ..Default::default()
        };

        Ok(Arc::new(NativeControllerType {
            descriptor,
            type_name,
            info,
            ports,
            library: Arc::clone(&self.inner),
        }))
    }
}

// ============================================================================
// Controller type & instances
// ============================================================================

struct NativeControllerType {
    descriptor: NativeControllerV1,
    type_name: String,
    info: WidgetInfo,
    ports: NativePorts,
    library: Arc<LoadedLibrary>,
}

// SAFETY: the descriptor only holds pointers into static data of `library`,
// which this value keeps loaded; the ABI requires its callbacks to be callable
// from any thread.
unsafe impl Send for NativeControllerType {}
unsafe impl Sync for NativeControllerType {}

impl ControllerType for NativeControllerType {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn info(&self) -> WidgetInfo {
        self.info.clone()
    }

    fn instantiate(&self, init: ControllerInit) -> Result<Box<dyn Controller>, ControllerError> {
        let fail = |message: String| ControllerError::Instantiation {
            type_name: self.type_name.clone(),
            message,
        };

        let settings = serde_json::to_string(&init.settings).map_err(|e| fail(e.to_string()))?;
        let settings = CString::new(settings).map_err(|e| fail(e.to_string()))?;

        // SAFETY: `create` comes from a validated descriptor; the argument is
        // a valid nul-terminated string for the duration of the call.
        let handle = unsafe { (self.descriptor.create)(settings.as_ptr(), init.restoring) };
        if handle.is_null() {
            return Err(fail("native constructor returned null".to_string()));
        }

        Ok(Box::new(NativeController {
            handle,
            descriptor: self.descriptor,
            ports: self.ports.clone(),
            closed: false,
            _library: Arc::clone(&self.library),
        }))
    }
}

struct NativeController {
    handle: *mut c_void,
    descriptor: NativeControllerV1,
    ports: NativePorts,
    closed: bool,
    /// Dropped after `handle` is destroyed.
    _library: Arc<LoadedLibrary>,
}

impl NativeController {
    fn destroy(&mut self) {
        if !self.closed {
            self.closed = true;
            // SAFETY: handle was returned by `create` and is destroyed once.
            unsafe { (self.descriptor.destroy)(self.handle) };
        }
    }
}

impl Controller for NativeController {
    fn inputs(&self) -> Vec<PortSpec> {
        self.ports.inputs.clone()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        self.ports.outputs.clone()
    }

    fn settings(&self) -> Settings {
        if self.closed {
            return Settings::new();
        }
        // SAFETY: live handle; the returned string is released below.
        let raw = unsafe { (self.descriptor.settings)(self.handle) };
        if raw.is_null() {
            return Settings::new();
        }
        // SAFETY: non-null, nul-terminated, owned until free_string.
        let json = unsafe { read_str(raw) }.unwrap_or_default();
        // SAFETY: `raw` came from this library's `settings`.
        unsafe { (self.descriptor.free_string)(raw) };

        serde_json::from_str(&json).unwrap_or_default()
    }

    fn set_input(&mut self, name: &str, value: &Value) {
        if self.closed {
            return;
        }
        let (Ok(name), Ok(value)) = (CString::new(name), CString::new(value.to_string())) else {
            return;
        };
        // SAFETY: live handle, both strings valid for the call.
        unsafe { (self.descriptor.set_input)(self.handle, name.as_ptr(), value.as_ptr()) };
    }

    fn close(&mut self) {
        self.destroy();
    }
}

impl Drop for NativeController {
    fn drop(&mut self) {
        self.destroy();
    }
}
