//! Quaver - dynamic widget runtime.

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

use quaver::build::{BuildSettings, BuildState, BuildSystem};
use quaver::config::RuntimeConfig;
use quaver::core::setup_shutdown_handler;
use quaver::error::ErrorLog;
use quaver::factory::LiveInstances;
use quaver::graph::HostId;
use quaver::module::LoaderSet;
use quaver::runtime::{Runtime, UiHandle};
use quaver::watch::WidgetWatcher;
use quaver::{log, logger};

/// Host slot of the layout given on the command line.
const MAIN_WINDOW: HostId = HostId(0);

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    let shutdown = setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = RuntimeConfig::load(&cli.config)?;

    match &cli.command {
        Commands::Run { layout } => run(&config, layout.as_deref(), &shutdown),
        Commands::Build { dir } => build_once(&config, dir),
    }
}

fn tokio_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("quaver-build")
        .build()
        .context("failed to start build runtime")
}

/// Watch, build and hot-swap until Ctrl+C.
fn run(
    config: &RuntimeConfig,
    layout: Option<&Path>,
    shutdown: &quaver::core::ShutdownSignal,
) -> Result<()> {
    let errors = ErrorLog::new();
    let mut runtime = Runtime::new(&config.layout, errors.clone());
    let tokio = tokio_runtime()?;

    let build = Arc::new(BuildSystem::new(
        config.widgets_dir().to_path_buf(),
        BuildSettings::from_config(config),
        LoaderSet::default(),
        runtime.handle(),
        errors,
        runtime.live_instances(),
    ));

    // Watcher first, so edits made during the initial builds are not lost
    let watcher = WidgetWatcher::new(
        Arc::clone(&build),
        Duration::from_millis(config.build.debounce_ms),
    )
    .context("failed to watch widget directory")?;
    build.start(tokio.handle());
    let watch_task = watcher.spawn(tokio.handle());

    if let Some(path) = layout
        && path.exists()
    {
        runtime
            .load_layout(path, MAIN_WINDOW)
            .with_context(|| format!("failed to load layout {}", path.display()))?;
    }

    log!("run"; "watching {} (Ctrl+C to stop)", config.widgets_dir().display());
    runtime.run(shutdown);

    if let Some(path) = layout {
        match runtime.save_layout(MAIN_WINDOW, path) {
            Ok(true) => log!("run"; "layout saved to {}", path.display()),
            Ok(false) => {}
            Err(e) => log!("run"; "failed to save layout: {}", e),
        }
    }

    build.shutdown();
    watch_task.abort();
    tokio.shutdown_timeout(Duration::from_secs(2));
    Ok(())
}

/// Build a single widget directory.
fn build_once(config: &RuntimeConfig, dir: &Path) -> Result<()> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("no such widget directory: {}", dir.display()))?;
    let root = dir.parent().unwrap_or(&dir).to_path_buf();

    // No UI here; registration messages are dropped.
    let (ui, _rx) = UiHandle::channel();
    let build = BuildSystem::new(
        root,
        BuildSettings::from_config(config),
        LoaderSet::default(),
        ui,
        ErrorLog::new(),
        LiveInstances::new(),
    );

    let state = tokio_runtime()?.block_on(build.build_now(&dir));
    match state {
        BuildState::Registered(id) => {
            log!("build"; "{} ok, factory {}", dir.display(), id);
            Ok(())
        }
        BuildState::NoSource => {
            log!("build"; "{} has no widget sources", dir.display());
            Ok(())
        }
        BuildState::CompileFailed(diagnostics) => bail!("build failed:\n{diagnostics}"),
        other => bail!("unexpected build state {other:?}"),
    }
}
