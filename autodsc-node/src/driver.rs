//! Driver - decides which lifecycle operation to run for an address.
//!
//! The reconciler knows how to talk to the service; the driver looks at the
//! state store and the observed remote object to pick create, update or
//! replace, and wires import/destroy/show around the same calls.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ReconcileError, Result};
use crate::identity::ResourceIdentity;
use crate::reconciler::{ReadOutcome, Reconciler};
use crate::spec::{DesiredSpec, ObservedState};
use crate::store::StateStore;

/// Action chosen for an apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Nothing tracked, or the tracked object vanished.
    Create,
    /// Upsert over the tracked object.
    Update { current: ResourceIdentity },
    /// An identifying field changed: delete the tracked object, then create.
    Replace { previous: ResourceIdentity },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    #[serde(flatten)]
    pub action: Plan,
    pub identity: ResourceIdentity,
    pub observed: ObservedState,
}

/// Result of looking at an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResourceStatus {
    Untracked,
    /// Was tracked, but the remote object is gone; the entry has been dropped.
    Absent { previous: ResourceIdentity },
    Present {
        identity: ResourceIdentity,
        observed: ObservedState,
    },
}

pub struct Driver<R> {
    reconciler: R,
    store: Arc<dyn StateStore>,
}

impl<R> Driver<R>
where
    R: Reconciler<Spec = DesiredSpec, Observed = ObservedState>,
{
    pub fn new(reconciler: R, store: Arc<dyn StateStore>) -> Self {
        Self { reconciler, store }
    }

    pub async fn plan(
        &self,
        cancel: &CancellationToken,
        address: &str,
        spec: &DesiredSpec,
    ) -> Result<Plan> {
        spec.validate()?;

        let Some(current) = self.store.get(address).await? else {
            return Ok(Plan::Create);
        };

        match self.reconciler.read(cancel, address, &current).await? {
            ReadOutcome::Absent => {
                warn!("{} was deleted outside of autodsc, recreating", address);
                Ok(Plan::Create)
            }
            ReadOutcome::Present(observed) if spec.requires_replacement(&observed) => {
                info!(
                    "{}: {}/{}/{} -> {}/{}/{} forces replacement",
                    address,
                    observed.resource_group,
                    observed.account_name,
                    observed.name,
                    spec.resource_group,
                    spec.account_name,
                    spec.name
                );
                Ok(Plan::Replace { previous: current })
            }
            ReadOutcome::Present(_) => Ok(Plan::Update { current }),
        }
    }

    pub async fn apply(
        &self,
        cancel: &CancellationToken,
        address: &str,
        spec: &DesiredSpec,
    ) -> Result<ApplyReport> {
        let action = self.plan(cancel, address, spec).await?;

        if let Plan::Replace { previous } = &action {
            self.reconciler.delete(cancel, address, previous).await?;
        }

        let identity = self
            .reconciler
            .create_or_update(cancel, address, spec)
            .await?;

        let observed = match self.reconciler.read(cancel, address, &identity).await? {
            ReadOutcome::Present(observed) => observed,
            ReadOutcome::Absent => {
                return Err(ReconcileError::Integrity {
                    name: spec.name.clone(),
                    resource_group: spec.resource_group.clone(),
                });
            }
        };

        info!("Applied {} ({})", address, identity);
        Ok(ApplyReport {
            action,
            identity,
            observed,
        })
    }

    pub async fn show(&self, cancel: &CancellationToken, address: &str) -> Result<ResourceStatus> {
        let Some(identity) = self.store.get(address).await? else {
            return Ok(ResourceStatus::Untracked);
        };

        Ok(match self.reconciler.read(cancel, address, &identity).await? {
            ReadOutcome::Present(observed) => ResourceStatus::Present { identity, observed },
            ReadOutcome::Absent => ResourceStatus::Absent { previous: identity },
        })
    }

    /// Delete the tracked object. Returns the identity that was destroyed, if any.
    pub async fn destroy(
        &self,
        cancel: &CancellationToken,
        address: &str,
    ) -> Result<Option<ResourceIdentity>> {
        let Some(identity) = self.store.get(address).await? else {
            info!("{} is not tracked, nothing to destroy", address);
            return Ok(None);
        };

        self.reconciler.delete(cancel, address, &identity).await?;
        info!("Destroyed {} ({})", address, identity);
        Ok(Some(identity))
    }

    /// Start tracking an existing remote object under `address`.
    pub async fn import(
        &self,
        cancel: &CancellationToken,
        address: &str,
        raw_id: &str,
    ) -> Result<ResourceStatus> {
        if let Some(existing) = self.store.get(address).await? {
            return Err(ReconcileError::AlreadyTracked {
                address: address.to_string(),
                id: existing.to_string(),
            });
        }

        let identity = self.reconciler.import(raw_id);
        match self.reconciler.read(cancel, address, &identity).await? {
            ReadOutcome::Present(observed) => {
                self.store.put(address, &identity).await?;
                info!("Imported {} as {}", identity, address);
                Ok(ResourceStatus::Present { identity, observed })
            }
            ReadOutcome::Absent => Err(ReconcileError::ImportMissing(raw_id.to_string())),
        }
    }
}
