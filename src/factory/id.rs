use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable factory identity. Defaults to the controller's simple type name
/// and survives recompilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactoryId(String);

impl FactoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactoryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FactoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
