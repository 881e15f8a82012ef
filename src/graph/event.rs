use super::{ComponentId, HostId};
use crate::factory::FactoryId;

/// Observable graph change, drained by the UI after each mutation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// One slot of a container changed; only that slot needs refreshing.
    SlotChanged { container: ComponentId, index: i32 },
    /// Effective lock of a component flipped.
    LockChanged { id: ComponentId, locked: bool },
    WidgetLoaded { id: ComponentId, factory: FactoryId },
    WidgetReplaced { id: ComponentId, factory: FactoryId },
    RootReplaced { host: HostId, id: ComponentId },
    Closed { id: ComponentId },
    /// A container became empty under the no-empty-container policy.
    WindowCloseRequested { host: Option<HostId>, root: ComponentId },
}
