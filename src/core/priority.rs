//! Priority levels for widget build ordering.

/// Priority level for build ordering
///
/// Higher value = higher priority (processed first in BinaryHeap)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildPriority {
    /// Startup scan of a directory nobody is using yet - lowest priority
    Background = 0,
    /// Directory touched by the user, no live instances
    Changed = 1,
    /// Directory backing at least one live widget instance - highest priority
    Live = 2,
}
