//! Core types - small abstractions shared across the runtime.

mod observable;
mod priority;
mod state;
mod thread;

pub use observable::{ListChange, ObservableList, ObservableSet, SetChange};
pub use priority::BuildPriority;
pub use state::{ShutdownSignal, is_shutdown, request_shutdown, setup_shutdown_handler};
pub use thread::UiThread;
