//! Per-directory build monitor.
//!
//! ```text
//! NoSource            no sources in the directory
//! Stale ──compile──▶ Compiling ──▶ CompileOk ──▶ (re-check) Fresh ──▶ Registered
//!                               └─▶ CompileFailed(diagnostics)   (retryable)
//! Disposed            terminal
//! ```
//!
//! `update_factory()` is serialized per monitor; at most one compiler run
//! happens per call.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::compile::compile;
use super::freshness::{self, Staleness};
use super::source::{WidgetSource, widget_name};
use super::{BuildContext, BuildError};
use crate::error::AppError;
use crate::factory::{FactoryId, WidgetFactory};
use crate::logger::{status_error, status_success};
use crate::module::ModuleScope;
use crate::runtime::UiMsg;
use crate::{debug, log};

/// Observable state of a [`BuildMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    NoSource,
    Stale,
    Fresh,
    Compiling,
    CompileOk,
    CompileFailed(String),
    Registered(FactoryId),
    Disposed,
}

/// Removes the directory from the compiling set on every exit path,
/// including cancellation of the build future.
struct CompilingGuard<'a> {
    ctx: &'a BuildContext,
    dir: &'a Path,
}

impl<'a> CompilingGuard<'a> {
    fn enter(ctx: &'a BuildContext, dir: &'a Path) -> Self {
        ctx.compiling.insert(dir.to_path_buf());
        Self { ctx, dir }
    }
}

impl Drop for CompilingGuard<'_> {
    fn drop(&mut self) {
        self.ctx.compiling.remove(&self.dir.to_path_buf());
    }
}

pub struct BuildMonitor {
    dir: PathBuf,
    ctx: Arc<BuildContext>,
    /// Serializes `update_factory` calls.
    build_lock: tokio::sync::Mutex<()>,
    state: Mutex<BuildState>,
    registered: Mutex<Option<FactoryId>>,
    disposed: AtomicBool,
}

impl BuildMonitor {
    pub fn new(dir: PathBuf, ctx: Arc<BuildContext>) -> Self {
        Self {
            dir,
            ctx,
            build_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(BuildState::NoSource),
            registered: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> BuildState {
        self.state.lock().clone()
    }

    /// Id of the factory this monitor registered, if any.
    pub fn registered(&self) -> Option<FactoryId> {
        self.registered.lock().clone()
    }

    /// Factory id this directory produces: the registered one, else the
    /// default derived from the directory name.
    pub fn factory_id(&self) -> FactoryId {
        self.registered()
            .unwrap_or_else(|| FactoryId::new(widget_name(&self.dir)))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// `Disposed` is terminal and never overwritten.
    fn set_state(&self, state: BuildState) {
        let mut current = self.state.lock();
        if *current == BuildState::Disposed {
            return;
        }
        debug!("build"; "{}: {:?}", self.label(), state);
        *current = state;
    }

    fn label(&self) -> String {
        widget_name(&self.dir)
    }

    /// Bring the registered factory in line with the sources on disk.
    pub async fn update_factory(&self) -> BuildState {
        if self.is_disposed() {
            return BuildState::Disposed;
        }
        let _guard = self.build_lock.lock().await;
        if self.is_disposed() {
            return BuildState::Disposed;
        }

        let result = self.run().await;
        // Disposed while the compiler ran
        if self.is_disposed() {
            return BuildState::Disposed;
        }
        let state = match result {
            Ok(state) => state,
            Err(err) => self.fail(err),
        };
        self.set_state(state.clone());
        state
    }

    async fn run(&self) -> Result<BuildState, BuildError> {
        let mut compiled = false;
        loop {
            let Some(source) = WidgetSource::scan(&self.dir)? else {
                self.unregister();
                return Ok(BuildState::NoSource);
            };

            match freshness::check(&source, self.ctx.settings.developer_mode) {
                Staleness::Fresh => {
                    self.set_state(BuildState::Fresh);
                    return self.register(&source);
                }
                Staleness::Stale if compiled => {
                    return Err(BuildError::NoArtifacts(source.output_dir()));
                }
                Staleness::Stale => {
                    self.set_state(BuildState::Stale);
                    self.compile(&source).await?;
                    if self.is_disposed() {
                        return Ok(BuildState::Disposed);
                    }
                    self.set_state(BuildState::CompileOk);
                    compiled = true;
                }
            }
        }
    }

    async fn compile(&self, source: &WidgetSource) -> Result<(), BuildError> {
        let _compiling = CompilingGuard::enter(&self.ctx, &self.dir);
        self.set_state(BuildState::Compiling);
        log!("build"; "compiling {} ({})", source.name, source.language);

        let output = compile(source, &self.ctx.settings.options).await?;
        debug!("build"; "{} compiled in {:?}", source.name, output.duration);
        if !output.stderr.trim().is_empty() {
            debug!("build"; "{}", output.stderr.trim());
        }
        Ok(())
    }

    /// Load compiled output and hand the factory to the UI thread.
    ///
    /// The disposed check and the UI send happen under the `registered`
    /// lock, so a concurrent `dispose` either wins before registration or
    /// sends its unregister after it.
    fn register(&self, source: &WidgetSource) -> Result<BuildState, BuildError> {
        let scope = ModuleScope {
            language: source.language,
            output_dir: source.output_dir(),
            libraries: source.libraries(),
        };
        let module = self.ctx.loaders.load(&scope)?;
        let controller_type = module.resolve(&source.qualified_name())?;

        let factory = WidgetFactory::new(controller_type).with_source_dir(&self.dir);
        let id = factory.id().clone();

        let mut registered = self.registered.lock();
        if self.is_disposed() {
            return Ok(BuildState::Disposed);
        }
        let previous = registered.replace(id.clone());
        if let Some(previous) = previous.filter(|p| *p != id) {
            self.ctx.ui.send(UiMsg::UnregisterFactory(previous));
        }
        self.ctx.ui.send(UiMsg::RegisterFactory(Arc::new(factory)));
        drop(registered);

        status_success(&format!("registered {id}"));
        Ok(BuildState::Registered(id))
    }

    fn unregister(&self) {
        if let Some(id) = self.registered.lock().take() {
            log!("build"; "{} has no sources, unregistering {}", self.label(), id);
            self.ctx.ui.send(UiMsg::UnregisterFactory(id));
        }
    }

    /// Surface the failure; the registry stays untouched.
    fn fail(&self, err: BuildError) -> BuildState {
        let name = self.label();
        let summary = format!("{name}: {err}");
        let diagnostics = err.diagnostics().to_string();

        status_error(&summary, &diagnostics);
        let mut entry = AppError::from_error(format!("build:{name}"), &err);
        if !diagnostics.is_empty() {
            entry = entry.with_detail(diagnostics.clone());
        }
        self.ctx.errors.push(entry);

        BuildState::CompileFailed(if diagnostics.is_empty() {
            summary
        } else {
            diagnostics
        })
    }

    /// Stop monitoring: leave the compiling set and deregister the factory.
    /// Safe to call more than once.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.ctx.compiling.remove(&self.dir);
        if let Some(id) = self.registered.lock().take() {
            self.ctx.ui.send(UiMsg::UnregisterFactory(id));
        }
        *self.state.lock() = BuildState::Disposed;
    }
}
