//! Live widget builds.
//!
//! One [`BuildMonitor`] per widget directory under the widget root. File
//! changes and the startup scan submit directories to a shared
//! [`BuildQueue`]; a bounded pool of tokio workers drains it, directories
//! with live widget instances first. Only factory registration crosses to
//! the UI thread, as a [`UiMsg`](crate::runtime::UiMsg).
//!
//! ```text
//! watch ──on_changes──▶ BuildQueue ──workers──▶ BuildMonitor::update_factory
//!                                                  │ scan → staleness → compile → load
//!                                                  ▼
//!                                           UiHandle (RegisterFactory)
//! ```

mod compile;
mod freshness;
mod monitor;
mod scheduler;
mod source;


pub use compile::{CompileError, CompileOptions, CompileOutput, compile, compiler_args};
pub use freshness::{Staleness, check as check_staleness};
pub use monitor::{BuildMonitor, BuildState};
pub use scheduler::{BuildQueue, Job};
pub use source::{
    LIBRARY_DIR, OUTPUT_DIR, SKIN_FILE, SOURCE_DIR, SourceError, SourceLanguage, WidgetSource,
    widget_name,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::RuntimeConfig;
use crate::core::{BuildPriority, ObservableSet};
use crate::error::ErrorLog;
use crate::factory::LiveInstances;
use crate::module::{LoaderSet, ModuleError};
use crate::runtime::{UiHandle, UiMsg};
use crate::watch::ChangeKind;
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("compilation failed")]
    Compile(#[from] CompileError),

    #[error("failed to load widget")]
    Module(#[from] ModuleError),

    #[error("compiler produced no artifacts in `{0}`")]
    NoArtifacts(PathBuf),
}

impl BuildError {
    /// Compiler output for failed compilations, else empty.
    pub fn diagnostics(&self) -> &str {
        match self {
            Self::Compile(err) => err.diagnostics(),
            _ => "",
        }
    }
}

/// Build settings derived from configuration.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub options: CompileOptions,
    pub developer_mode: bool,
    pub parallelism: usize,
}

impl BuildSettings {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            options: CompileOptions {
                compilers: config.build.compilers.clone(),
                classpath: config.build.classpath.clone(),
                encoding: config.build.encoding.clone(),
                timeout: Duration::from_secs(config.build.timeout_secs),
            },
            developer_mode: config.widgets.developer_mode,
            parallelism: config.build.effective_parallelism(),
        }
    }
}

/// State shared by all monitors and workers.
pub struct BuildContext {
    pub settings: BuildSettings,
    pub loaders: LoaderSet,
    pub ui: UiHandle,
    /// Directories with a compiler currently running.
    pub compiling: ObservableSet<PathBuf>,
    pub errors: ErrorLog,
}

type Monitors = Arc<DashMap<PathBuf, Arc<BuildMonitor>>>;

pub struct BuildSystem {
    root: PathBuf,
    ctx: Arc<BuildContext>,
    monitors: Monitors,
    queue: BuildQueue,
    live: LiveInstances,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BuildSystem {
    pub fn new(
        root: PathBuf,
        settings: BuildSettings,
        loaders: LoaderSet,
        ui: UiHandle,
        errors: ErrorLog,
        live: LiveInstances,
    ) -> Self {
        Self {
            root,
            ctx: Arc::new(BuildContext {
                settings,
                loaders,
                ui,
                compiling: ObservableSet::new(),
                errors,
            }),
            monitors: Arc::new(DashMap::new()),
            queue: BuildQueue::new(),
            live,
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    /// Directories currently compiling.
    pub fn compiling(&self) -> &ObservableSet<PathBuf> {
        &self.ctx.compiling
    }

    pub fn monitor(&self, dir: &Path) -> Option<Arc<BuildMonitor>> {
        self.monitors.get(dir).map(|m| Arc::clone(&m))
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Spawn the worker pool on `handle` and queue every widget directory.
    pub fn start(&self, handle: &Handle) {
        let mut workers = self.workers.lock();
        for worker in 0..self.ctx.settings.parallelism.max(1) {
            let queue = self.queue.clone();
            let monitors = Arc::clone(&self.monitors);
            workers.push(handle.spawn(async move {
                while let Some(job) = queue.next().await {
                    let monitor = monitors.get(&job.dir).map(|m| Arc::clone(&m));
                    if let Some(monitor) = monitor {
                        debug!("build"; "worker {worker}: {} ({:?})", job.dir.display(), job.priority);
                        monitor.update_factory().await;
                    }
                }
            }));
        }
        drop(workers);

        let dirs = self.scan_root();
        log!("build"; "watching {} widget directories in {}", dirs.len(), self.root.display());
        for dir in dirs {
            self.schedule(dir, BuildPriority::Background);
        }
    }

    /// Immediate subdirectories of the root, hidden ones skipped.
    pub fn scan_root(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut dirs: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir() && !is_hidden(p))
            .collect();
        dirs.sort();
        dirs
    }

    pub fn ensure_monitor(&self, dir: &Path) -> Arc<BuildMonitor> {
        let monitor = self
            .monitors
            .entry(dir.to_path_buf())
            .or_insert_with(|| Arc::new(BuildMonitor::new(dir.to_path_buf(), Arc::clone(&self.ctx))));
        Arc::clone(&monitor)
    }

    /// Queue a build. Directories with live widgets jump to `Live`.
    pub fn schedule(&self, dir: PathBuf, trigger: BuildPriority) -> bool {
        let monitor = self.ensure_monitor(&dir);
        let priority = if self.live.count(&monitor.factory_id()) > 0 {
            trigger.max(BuildPriority::Live)
        } else {
            trigger
        };
        self.queue.submit(dir, priority)
    }

    /// Build one directory now, bypassing the queue.
    pub async fn build_now(&self, dir: &Path) -> BuildState {
        self.ensure_monitor(dir).update_factory().await
    }

    /// Stop monitoring a directory (deleted from disk).
    pub fn remove_monitor(&self, dir: &Path) {
        self.queue.cancel(dir);
        if let Some((_, monitor)) = self.monitors.remove(dir) {
            log!("build"; "{} removed", widget_name(dir));
            monitor.dispose();
        }
    }

    /// Route debounced file changes to the affected monitors.
    pub fn on_changes(&self, changes: &[(PathBuf, ChangeKind)]) {
        let mut by_dir: Vec<(PathBuf, Vec<&Path>)> = Vec::new();
        for (path, _) in changes {
            let Some(dir) = self.widget_dir_of(path) else {
                continue;
            };
            match by_dir.iter_mut().find(|(d, _)| *d == dir) {
                Some((_, paths)) => paths.push(path.as_path()),
                None => by_dir.push((dir, vec![path.as_path()])),
            }
        }

        for (dir, paths) in by_dir {
            if !dir.is_dir() {
                self.remove_monitor(&dir);
                continue;
            }

            let relevant: Vec<&Path> = paths
                .into_iter()
                .filter(|p| !p.starts_with(dir.join(OUTPUT_DIR)))
                .collect();
            if relevant.is_empty() {
                continue;
            }

            let skin = dir.join(SKIN_FILE);
            if relevant.iter().all(|p| *p == skin) {
                let factory = self.ensure_monitor(&dir).factory_id();
                debug!("build"; "skin changed for {factory}");
                self.ctx.ui.send(UiMsg::SkinChanged {
                    factory,
                    stylesheet: skin,
                });
                continue;
            }

            self.schedule(dir, BuildPriority::Changed);
        }
    }

    /// Widget directory containing `path`: its first component below the root.
    fn widget_dir_of(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let first = relative.components().next()?;
        let dir = self.root.join(first);
        (!is_hidden(&dir)).then_some(dir)
    }

    pub fn is_shut_down(&self) -> bool {
        self.queue.is_shutdown()
    }

    /// Stop workers, drop pending jobs and dispose all monitors. In-flight
    /// compiler processes are killed when their worker task is dropped.
    pub fn shutdown(&self) {
        self.queue.shutdown();
        for worker in self.workers.lock().drain(..) {
            worker.abort();
        }
        for entry in self.monitors.iter() {
            entry.value().dispose();
        }
    }
}

impl Drop for BuildSystem {
    fn drop(&mut self) {
        self.queue.shutdown();
        for worker in self.workers.get_mut().drain(..) {
            worker.abort();
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
