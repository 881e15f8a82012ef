//! Container layouts and their index domains.
//!
//! | Layout   | Valid indexes           |
//! |----------|-------------------------|
//! | Uni      | `1`                     |
//! | Bi       | `1, 2`                  |
//! | Seq      | `0, 1, 2, ...`          |
//! | FreeForm | `1, 2, 3, ...`          |
//! | Switch   | `0, 1, -1, 2, -2, ...`  |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ComponentId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Split state of a [`Layout::Bi`] container.
#[derive(Debug, Clone, PartialEq)]
pub struct BiState {
    pub orientation: Orientation,
    /// Divider position as a fraction of the container size.
    pub position: f64,
    /// Child index collapsed to zero size.
    pub collapsed: Option<i32>,
    /// Child index keeping its absolute size on resize.
    pub absolute_size: Option<i32>,
    /// Children share a single header.
    pub joined: bool,
}

impl Default for BiState {
    fn default() -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: 0.5,
            collapsed: None,
            absolute_size: None,
            joined: false,
        }
    }
}

/// Fractional placement of a free-form child.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreeFormBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Default for FreeFormBox {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 0.5,
            h: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchState {
    pub translate: f64,
    pub snap: bool,
    pub zoom: f64,
}

impl Default for SwitchState {
    fn default() -> Self {
        Self {
            translate: 0.0,
            snap: true,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Uni,
    Bi(BiState),
    Seq { orientation: Orientation },
    FreeForm { boxes: BTreeMap<i32, FreeFormBox> },
    Switch(SwitchState),
}

impl Layout {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uni => "Uni",
            Self::Bi(_) => "Bi",
            Self::Seq { .. } => "Seq",
            Self::FreeForm { .. } => "FreeForm",
            Self::Switch(_) => "Switch",
        }
    }

    pub fn accepts(&self, index: i32) -> bool {
        match self {
            Self::Uni => index == 1,
            Self::Bi(_) => index == 1 || index == 2,
            Self::Seq { .. } => index >= 0,
            Self::FreeForm { .. } => index >= 1,
            Self::Switch(_) => true,
        }
    }

    /// Valid indexes in preference order. Infinite for all but Uni and Bi.
    pub fn valid_indexes(&self) -> Box<dyn Iterator<Item = i32>> {
        match self {
            Self::Uni => Box::new(std::iter::once(1)),
            Self::Bi(_) => Box::new([1, 2].into_iter()),
            Self::Seq { .. } => Box::new(0..),
            Self::FreeForm { .. } => Box::new(1..),
            Self::Switch(_) => Box::new((0..).map(|n: i32| if n % 2 == 1 { (n + 1) / 2 } else { -(n / 2) })),
        }
    }
}

/// Children of a container: `index -> component`, absent key means empty slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub layout: Layout,
    children: BTreeMap<i32, ComponentId>,
}

impl Container {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            children: BTreeMap::new(),
        }
    }

    pub fn uni() -> Self {
        Self::new(Layout::Uni)
    }

    pub fn bi(state: BiState) -> Self {
        Self::new(Layout::Bi(state))
    }

    pub fn seq(orientation: Orientation) -> Self {
        Self::new(Layout::Seq { orientation })
    }

    pub fn free_form() -> Self {
        Self::new(Layout::FreeForm {
            boxes: BTreeMap::new(),
        })
    }

    pub fn switch(state: SwitchState) -> Self {
        Self::new(Layout::Switch(state))
    }

    pub fn children(&self) -> &BTreeMap<i32, ComponentId> {
        &self.children
    }

    pub fn child(&self, index: i32) -> Option<ComponentId> {
        self.children.get(&index).copied()
    }

    /// The unique index holding `child`.
    pub fn index_of(&self, child: ComponentId) -> Option<i32> {
        self.children
            .iter()
            .find_map(|(index, id)| (*id == child).then_some(*index))
    }

    pub fn first_empty_index(&self) -> Option<i32> {
        self.layout
            .valid_indexes()
            .find(|index| !self.children.contains_key(index))
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Placement of a free-form child. `None` for other layouts.
    pub fn free_form_box(&self, index: i32) -> Option<FreeFormBox> {
        match &self.layout {
            Layout::FreeForm { boxes } => boxes.get(&index).copied(),
            _ => None,
        }
    }

    pub(super) fn set_free_form_box(&mut self, index: i32, placement: FreeFormBox) -> bool {
        match &mut self.layout {
            Layout::FreeForm { boxes } if index >= 1 => {
                boxes.insert(index, placement);
                true
            }
            _ => false,
        }
    }

    /// Raw slot write. Returns the previous occupant.
    ///
    /// A filled free-form slot always has a box. Clearing keeps it, so a
    /// child put back at the same index keeps its placement.
    pub(super) fn set_slot(&mut self, index: i32, child: Option<ComponentId>) -> Option<ComponentId> {
        match child {
            Some(child) => {
                if let Layout::FreeForm { boxes } = &mut self.layout {
                    boxes.entry(index).or_default();
                }
                self.children.insert(index, child)
            }
            None => self.children.remove(&index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_indexes_zigzag() {
        let indexes: Vec<_> = Layout::Switch(SwitchState::default())
            .valid_indexes()
            .take(7)
            .collect();
        assert_eq!(indexes, vec![0, 1, -1, 2, -2, 3, -3]);
    }

    #[test]
    fn test_domains() {
        assert!(Layout::Uni.accepts(1));
        assert!(!Layout::Uni.accepts(0));
        assert!(!Layout::Bi(BiState::default()).accepts(3));
        assert!(Layout::Seq { orientation: Orientation::Vertical }.accepts(0));
        assert!(!Layout::Seq { orientation: Orientation::Vertical }.accepts(-1));
        assert!(!Container::free_form().layout.accepts(0));
    }

    #[test]
    fn test_free_form_slot_gets_default_box() {
        let mut container = Container::free_form();
        let child = ComponentId::new();
        container.set_slot(2, Some(child));
        assert_eq!(container.free_form_box(2), Some(FreeFormBox::default()));

        let placement = FreeFormBox {
            x: 0.1,
            y: 0.2,
            w: 0.3,
            h: 0.4,
        };
        assert!(container.set_free_form_box(2, placement));
        container.set_slot(2, None);
        container.set_slot(2, Some(child));
        assert_eq!(container.free_form_box(2), Some(placement));

        assert!(!Container::uni().set_free_form_box(1, placement));
        assert!(!container.set_free_form_box(0, placement));
        assert!(Layout::Switch(SwitchState::default()).accepts(-5));
    }

    #[test]
    fn test_first_empty_index() {
        let mut bi = Container::bi(BiState::default());
        assert_eq!(bi.first_empty_index(), Some(1));
        bi.set_slot(1, Some(ComponentId::new()));
        assert_eq!(bi.first_empty_index(), Some(2));
        bi.set_slot(2, Some(ComponentId::new()));
        assert_eq!(bi.first_empty_index(), None);

        let mut switch = Container::switch(SwitchState::default());
        switch.set_slot(0, Some(ComponentId::new()));
        switch.set_slot(1, Some(ComponentId::new()));
        assert_eq!(switch.first_empty_index(), Some(-1));
    }

    #[test]
    fn test_index_of() {
        let a = ComponentId::new();
        let b = ComponentId::new();
        let mut seq = Container::seq(Orientation::Horizontal);
        seq.set_slot(0, Some(a));
        seq.set_slot(4, Some(b));
        assert_eq!(seq.index_of(b), Some(4));
        assert_eq!(seq.index_of(ComponentId::new()), None);
        assert_eq!(seq.first_empty_index(), Some(1));
    }
}
