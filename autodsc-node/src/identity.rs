//! Opaque identifier persisted between runs.

use std::fmt;

use autodsc_arm::{NodeConfigurationId, ResourceIdError};
use serde::{Deserialize, Serialize};

/// Identity string handed out by the service. Stored verbatim; decomposed
/// only when an operation needs its segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<NodeConfigurationId, ResourceIdError> {
        NodeConfigurationId::parse(&self.0)
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NodeConfigurationId> for ResourceIdentity {
    fn from(id: NodeConfigurationId) -> Self {
        Self(id.to_string())
    }
}
