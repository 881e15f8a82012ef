//! Widget root watcher.
//!
//! ```text
//! notify (recursive on the widget root) → Debouncer (per directory) → BuildSystem::on_changes
//! ```
//!
//! The watcher is created before the initial scan so changes made while
//! the first builds run are buffered, not lost.

mod debouncer;
mod types;

pub use types::ChangeKind;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::build::{BuildSystem, OUTPUT_DIR};
use crate::{debug, log};
use debouncer::Debouncer;

/// Upper bound on one loop iteration, so shutdown and root re-attach are
/// noticed while idle.
const TICK: Duration = Duration::from_millis(250);

pub struct WidgetWatcher {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    root: PathBuf,
    /// Some backends report canonical paths.
    canonical_root: PathBuf,
    attached: bool,
    build: Arc<BuildSystem>,
    debouncer: Debouncer,
}

impl WidgetWatcher {
    /// Start watching the build system's root immediately. A root that does
    /// not exist yet is attached once it appears.
    pub fn new(build: Arc<BuildSystem>, debounce: Duration) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let root = build.root().to_path_buf();
        let mut this = Self {
            notify_rx,
            watcher,
            canonical_root: root.canonicalize().unwrap_or_else(|_| root.clone()),
            root,
            attached: false,
            build,
            debouncer: Debouncer::new(debounce),
        };
        this.attach()?;
        Ok(this)
    }

    fn attach(&mut self) -> notify::Result<()> {
        if self.attached || !self.root.is_dir() {
            return Ok(());
        }
        self.watcher.watch(&self.root, RecursiveMode::Recursive)?;
        self.canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        self.attached = true;
        debug!("watch"; "watching {}", self.root.display());
        Ok(())
    }

    /// Re-attach after the root was deleted and recreated.
    fn maintain(&mut self) {
        if self.attached && !self.root.is_dir() {
            self.attached = false;
        }
        if let Err(e) = self.attach() {
            log!("watch"; "cannot watch {}: {}", self.root.display(), e);
        }
    }

    /// Split a reported path into (widget directory, path under our root).
    /// Compiler output is dropped here already.
    fn resolve(&self, path: &Path) -> Option<(PathBuf, PathBuf)> {
        let relative = path
            .strip_prefix(&self.canonical_root)
            .or_else(|_| path.strip_prefix(&self.root))
            .ok()?;
        let mut components = relative.components();
        let first = components.next()?;
        if components
            .next()
            .is_some_and(|c| c.as_os_str() == OUTPUT_DIR)
        {
            return None;
        }
        Some((self.root.join(first), self.root.join(relative)))
    }

    fn add_event(&mut self, event: &notify::Event) {
        let Some(kind) = ChangeKind::from_notify(&event.kind) else {
            return;
        };
        for path in &event.paths {
            if let Some((group, path)) = self.resolve(path) {
                self.debouncer.add(group, path, kind);
            }
        }
    }

    fn flush(&mut self) {
        let changes = self.debouncer.take_ready();
        if changes.is_empty() {
            return;
        }
        for (path, kind) in &changes {
            debug!("watch"; "{} {}", kind.label(), path.display());
        }
        self.build.on_changes(&changes);
    }

    /// Run until the build system shuts down.
    pub async fn run(mut self) {
        let (async_tx, mut async_rx) = tokio::sync::mpsc::channel::<notify::Event>(64);
        let notify_rx = std::mem::replace(&mut self.notify_rx, std::sync::mpsc::channel().1);

        // notify delivers on its own thread; bridge into the async loop
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => self.add_event(&event),
                _ = tokio::time::sleep(self.debouncer.sleep_duration().min(TICK)) => {
                    self.maintain();
                    self.flush();
                }
            }
            if self.build.is_shut_down() {
                debug!("watch"; "build system stopped, watcher exiting");
                break;
            }
        }
    }

    pub fn spawn(self, handle: &Handle) -> JoinHandle<()> {
        handle.spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildSettings;
    use crate::config::RuntimeConfig;
    use crate::error::ErrorLog;
    use crate::factory::LiveInstances;
    use crate::module::LoaderSet;
    use crate::runtime::{UiHandle, UiMsg};

    fn build_system(root: &Path) -> (Arc<BuildSystem>, crossbeam::channel::Receiver<UiMsg>) {
        let (ui, rx) = UiHandle::channel();
        let build = BuildSystem::new(
            root.to_path_buf(),
            BuildSettings::from_config(&RuntimeConfig::default()),
            LoaderSet::empty(),
            ui,
            ErrorLog::new(),
            LiveInstances::new(),
        );
        (Arc::new(build), rx)
    }

    #[test]
    fn test_resolve_groups_by_widget_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let (build, _rx) = build_system(dir.path());
        let watcher = WidgetWatcher::new(build, Duration::ZERO).unwrap();
        let root = dir.path();

        assert_eq!(
            watcher.resolve(&root.join("clock/src/Face.kt")),
            Some((root.join("clock"), root.join("clock/src/Face.kt")))
        );
        assert_eq!(watcher.resolve(&root.join("clock/out/Clock.class")), None);
        assert_eq!(watcher.resolve(Path::new("/elsewhere/file.kt")), None);
    }

    #[tokio::test]
    async fn test_skin_edit_reaches_ui() {
        let dir = tempfile::TempDir::new().unwrap();
        let clock = dir.path().join("clock");
        std::fs::create_dir_all(&clock).unwrap();
        let (build, rx) = build_system(dir.path());

        let watcher = WidgetWatcher::new(Arc::clone(&build), Duration::from_millis(20)).unwrap();
        let task = tokio::spawn(watcher.run());
        // Give the backend a moment to register the watch
        tokio::time::sleep(Duration::from_millis(100)).await;

        std::fs::write(clock.join("skin.css"), "label { color: red; }").unwrap();

        let mut received = None;
        for _ in 0..100 {
            if let Ok(msg) = rx.try_recv() {
                received = Some(msg);
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        build.shutdown();
        let _ = tokio::time::timeout(Duration::from_secs(2), task).await;

        match received {
            Some(UiMsg::SkinChanged { factory, stylesheet }) => {
                assert_eq!(factory.as_str(), "Clock");
                assert!(stylesheet.ends_with("clock/skin.css"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
