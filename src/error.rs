//! Application-wide error log.
//!
//! Every user-visible failure (missing factory, controller failure, compile
//! failure, hot-swap failure) is pushed here in addition to being returned
//! as a value. The log prints through `log!`, keeps a bounded history, and
//! fans entries out to subscribers (notification UI).

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::{debug, log};

/// History kept for late subscribers.
const HISTORY_LIMIT: usize = 256;

/// A user-visible failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    /// Subsystem or entity the failure belongs to (e.g. `build:Clock`).
    pub origin: String,
    pub message: String,
    /// Long-form detail such as compiler diagnostics.
    pub detail: Option<String>,
}

impl AppError {
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Build from an error value, folding its source chain into the message.
    pub fn from_error(origin: impl Into<String>, err: &dyn std::error::Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(origin, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.message)
    }
}

#[derive(Default)]
struct Inner {
    history: VecDeque<AppError>,
    subscribers: Vec<Sender<AppError>>,
}

/// Cloneable handle to the shared error log. Safe to use from any thread.
#[derive(Clone, Default)]
pub struct ErrorLog {
    inner: Arc<Mutex<Inner>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: AppError) {
        log!("error"; "{}", error);
        if let Some(detail) = &error.detail {
            debug!("error"; "{}", detail);
        }

        let mut inner = self.inner.lock();
        if inner.history.len() == HISTORY_LIMIT {
            inner.history.pop_front();
        }
        inner.history.push_back(error.clone());
        inner
            .subscribers
            .retain(|tx| tx.send(error.clone()).is_ok());
    }

    /// Push an error value under `origin`.
    pub fn report(&self, origin: impl Into<String>, err: &dyn std::error::Error) {
        self.push(AppError::from_error(origin, err));
    }

    /// Snapshot of the retained history, oldest first.
    pub fn entries(&self) -> Vec<AppError> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().history.is_empty()
    }

    /// Stream of errors pushed after this call.
    pub fn subscribe(&self) -> Receiver<AppError> {
        let (tx, rx) = channel::unbounded();
        self.inner.lock().subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_push_and_subscribe() {
        let errors = ErrorLog::new();
        let rx = errors.subscribe();

        errors.push(AppError::new("build:Clock", "compile failed").with_detail("line 3"));

        assert_eq!(errors.len(), 1);
        let received = rx.try_recv().unwrap();
        assert_eq!(received.origin, "build:Clock");
        assert_eq!(received.detail.as_deref(), Some("line 3"));
    }

    #[test]
    fn test_report_folds_source_chain() {
        let errors = ErrorLog::new();
        let err = Outer(std::io::Error::other("disk gone"));
        errors.report("io", &err);
        assert_eq!(errors.entries()[0].message, "outer: disk gone");
    }

    #[test]
    fn test_history_is_bounded() {
        let errors = ErrorLog::new();
        for i in 0..HISTORY_LIMIT + 5 {
            errors.push(AppError::new("test", i.to_string()));
        }
        let entries = errors.entries();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        assert_eq!(entries[0].message, "5");
    }
}
