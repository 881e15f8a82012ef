//! Configuration sections of `quaver.toml`.

mod build;
mod layout;
mod widgets;

pub use build::{BuildSectionConfig, CompilersConfig};
pub use layout::LayoutConfig;
pub use widgets::WidgetsConfig;
