//! Process-wide shutdown state.
//!
//! The Ctrl+C handler flips `SHUTDOWN` and wakes whoever registered a
//! shutdown signal, so the UI loop and the build workers stop together.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{Receiver, Sender};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender, set once by `setup_shutdown_handler`
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Receiving end of the shutdown signal.
pub type ShutdownSignal = Receiver<()>;

/// Setup the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<ShutdownSignal> {
    let (tx, rx) = crossbeam::channel::bounded(1);
    let _ = SHUTDOWN_TX.set(tx);

    ctrlc::set_handler(|| {
        crate::log!("run"; "shutting down...");
        request_shutdown();
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    Ok(rx)
}

/// Request shutdown and wake the registered listener (if any).
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    if let Some(tx) = SHUTDOWN_TX.get() {
        let _ = tx.try_send(());
    }
}

/// Check if shutdown has been requested
///
/// Relaxed ordering: worst case a worker picks up one more job before stopping.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
