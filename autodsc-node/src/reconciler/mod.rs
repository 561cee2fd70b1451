//! Reconcilers for remote resource kinds.
//!
//! A reconciler translates desired state into remote calls and maps the
//! answers back into identities and observed state. The orchestrator decides
//! which operation to call; a reconciler never branches on prior state.

pub mod node_configuration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::identity::ResourceIdentity;

pub use node_configuration::NodeConfigurationReconciler;

/// Outcome of reading a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    Present(T),
    /// The remote object no longer exists. Not an error.
    Absent,
}

impl<T> ReadOutcome<T> {
    pub fn present(self) -> Option<T> {
        match self {
            ReadOutcome::Present(t) => Some(t),
            ReadOutcome::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }
}

/// Lifecycle callbacks for one resource kind.
///
/// `address` names the logical resource instance in the state store.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The desired state supplied by the caller.
    type Spec: Send + Sync;
    /// The state reported back by a read.
    type Observed: Send;

    /// Create the resource or update it in place; records and returns its identity.
    async fn create_or_update(
        &self,
        cancel: &CancellationToken,
        address: &str,
        spec: &Self::Spec,
    ) -> Result<ResourceIdentity>;

    /// Observe the resource. A missing remote object yields
    /// [`ReadOutcome::Absent`] and its state entry is dropped.
    async fn read(
        &self,
        cancel: &CancellationToken,
        address: &str,
        id: &ResourceIdentity,
    ) -> Result<ReadOutcome<Self::Observed>>;

    /// Remove the resource. Deleting a missing object succeeds.
    async fn delete(
        &self,
        cancel: &CancellationToken,
        address: &str,
        id: &ResourceIdentity,
    ) -> Result<()>;

    /// Adopt a caller-supplied identity unchanged. Validation happens on the next read.
    fn import(&self, raw: &str) -> ResourceIdentity;
}
