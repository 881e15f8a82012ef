//! Observable collections for UI population.
//!
//! Consumers get read-only snapshots plus a change stream; only the owner
//! mutates. Subscribers whose receiver was dropped are pruned on the next
//! change.

use std::hash::Hash;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;

/// Change notification for [`ObservableList`].
#[derive(Debug, Clone, PartialEq)]
pub enum ListChange<T> {
    Added(T),
    Removed(T),
}

/// Change notification for [`ObservableSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetChange<T> {
    Inserted(T),
    Removed(T),
}

struct Subscribers<C> {
    senders: Mutex<Vec<Sender<C>>>,
}

impl<C: Clone> Subscribers<C> {
    fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    fn subscribe(&self) -> Receiver<C> {
        let (tx, rx) = channel::unbounded();
        self.senders.lock().push(tx);
        rx
    }

    fn emit(&self, change: C) {
        self.senders
            .lock()
            .retain(|tx| tx.send(change.clone()).is_ok());
    }
}

// ============================================================================
// ObservableList
// ============================================================================

/// Ordered list with change notifications.
pub struct ObservableList<T> {
    items: RwLock<Vec<T>>,
    subscribers: Subscribers<ListChange<T>>,
}

impl<T: Clone> ObservableList<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            subscribers: Subscribers::new(),
        }
    }

    pub fn push(&self, item: T) {
        self.items.write().push(item.clone());
        self.subscribers.emit(ListChange::Added(item));
    }

    /// Remove the first item matching `pred`.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let removed = {
            let mut items = self.items.write();
            let pos = items.iter().position(pred)?;
            items.remove(pos)
        };
        self.subscribers.emit(ListChange::Removed(removed.clone()));
        Some(removed)
    }

    /// Read-only copy of the current items.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().clone()
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.items.read().iter().find(|item| pred(*item)).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Stream of changes made after this call.
    pub fn subscribe(&self) -> Receiver<ListChange<T>> {
        self.subscribers.subscribe()
    }
}

impl<T: Clone> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ObservableSet
// ============================================================================

/// Unordered set with change notifications. Safe to share across threads.
pub struct ObservableSet<T> {
    items: RwLock<FxHashSet<T>>,
    subscribers: Subscribers<SetChange<T>>,
}

impl<T: Clone + Eq + Hash> ObservableSet<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(FxHashSet::default()),
            subscribers: Subscribers::new(),
        }
    }

    /// Returns `false` if the item was already present (no notification).
    pub fn insert(&self, item: T) -> bool {
        if !self.items.write().insert(item.clone()) {
            return false;
        }
        self.subscribers.emit(SetChange::Inserted(item));
        true
    }

    /// Returns `false` if the item was absent (no notification).
    pub fn remove(&self, item: &T) -> bool {
        if !self.items.write().remove(item) {
            return false;
        }
        self.subscribers.emit(SetChange::Removed(item.clone()));
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.read().contains(item)
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn subscribe(&self) -> Receiver<SetChange<T>> {
        self.subscribers.subscribe()
    }
}

impl<T: Clone + Eq + Hash> Default for ObservableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
