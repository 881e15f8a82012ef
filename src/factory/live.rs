use std::sync::Arc;

use dashmap::DashMap;

use super::FactoryId;

/// Live widget count per factory. Written by the graph on the UI thread,
/// read by build workers to prioritize directories in use.
#[derive(Debug, Clone, Default)]
pub struct LiveInstances(Arc<DashMap<FactoryId, usize>>);

impl LiveInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, id: &FactoryId) {
        *self.0.entry(id.clone()).or_insert(0) += 1;
    }

    pub fn decrement(&self, id: &FactoryId) {
        self.0.remove_if_mut(id, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }

    pub fn count(&self, id: &FactoryId) -> usize {
        self.0.get(id).map_or(0, |c| *c)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|e| *e.value()).sum()
    }
}
