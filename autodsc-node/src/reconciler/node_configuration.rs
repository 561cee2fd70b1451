//! Node configuration reconciler - drives DSC node configurations through ARM.

use std::sync::Arc;

use async_trait::async_trait;
use autodsc_arm::{NodeConfigurationClient, NodeConfigurationParameters};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ReadOutcome, Reconciler};
use crate::error::{Operation, ReconcileError, Result};
use crate::identity::ResourceIdentity;
use crate::spec::{DesiredSpec, ObservedState};
use crate::store::StateStore;

/// Node configuration reconciler that interacts with the automation API.
pub struct NodeConfigurationReconciler<C: ?Sized, S: ?Sized> {
    client: Arc<C>,
    store: Arc<S>,
}

impl<C, S> NodeConfigurationReconciler<C, S>
where
    C: NodeConfigurationClient + ?Sized,
    S: StateStore + ?Sized,
{
    pub fn new(client: Arc<C>, store: Arc<S>) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl<C, S> Reconciler for NodeConfigurationReconciler<C, S>
where
    C: NodeConfigurationClient + ?Sized,
    S: StateStore + ?Sized,
{
    type Spec = DesiredSpec;
    type Observed = ObservedState;

    async fn create_or_update(
        &self,
        cancel: &CancellationToken,
        address: &str,
        spec: &Self::Spec,
    ) -> Result<ResourceIdentity> {
        spec.validate()?;
        let parent = spec.parent_name()?;

        info!(
            "Preparing node configuration {} (configuration {}) in {}/{}",
            spec.name, parent, spec.resource_group, spec.account_name
        );

        let parameters = NodeConfigurationParameters::embedded(&spec.name, parent, &spec.content);
        self.client
            .create_or_update(
                cancel,
                &spec.resource_group,
                &spec.account_name,
                &spec.name,
                &parameters,
            )
            .await
            .map_err(|e| ReconcileError::remote(Operation::CreateOrUpdate, &spec.name, e))?;

        // The PUT response is not trusted to carry the identity.
        let read = self
            .client
            .get(cancel, &spec.resource_group, &spec.account_name, &spec.name)
            .await
            .map_err(|e| ReconcileError::remote(Operation::FetchIdentity, &spec.name, e))?;

        let id = match read.id {
            Some(id) if !id.is_empty() => ResourceIdentity::new(id),
            _ => {
                return Err(ReconcileError::Integrity {
                    name: spec.name.clone(),
                    resource_group: spec.resource_group.clone(),
                });
            }
        };

        self.store.put(address, &id).await?;
        info!("Node configuration {} is at {}", spec.name, id);
        Ok(id)
    }

    async fn read(
        &self,
        cancel: &CancellationToken,
        address: &str,
        id: &ResourceIdentity,
    ) -> Result<ReadOutcome<Self::Observed>> {
        let parsed = id.parse()?;
        debug!("Reading node configuration {}", parsed.name);

        let result = self
            .client
            .get(cancel, &parsed.resource_group, &parsed.account_name, &parsed.name)
            .await;
        match result {
            Ok(node) => Ok(ReadOutcome::Present(ObservedState {
                name: node.name.unwrap_or(parsed.name),
                // Not echoed reliably by the service; taken from the identity.
                account_name: parsed.account_name,
                resource_group: parsed.resource_group,
            })),
            Err(e) if e.is_not_found() => {
                warn!(
                    "Node configuration {} no longer exists, removing {} from state",
                    parsed.name, address
                );
                self.store.clear_if(address, id).await?;
                Ok(ReadOutcome::Absent)
            }
            Err(e) => Err(ReconcileError::remote(Operation::Read, &parsed.name, e)),
        }
    }

    async fn delete(
        &self,
        cancel: &CancellationToken,
        address: &str,
        id: &ResourceIdentity,
    ) -> Result<()> {
        let parsed = id.parse()?;
        info!("Deleting node configuration {}", parsed.name);

        let result = self
            .client
            .delete(cancel, &parsed.resource_group, &parsed.account_name, &parsed.name)
            .await;
        match result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!("Node configuration {} was already gone", parsed.name);
            }
            Err(e) => return Err(ReconcileError::remote(Operation::Delete, &parsed.name, e)),
        }

        self.store.clear_if(address, id).await?;
        Ok(())
    }

    fn import(&self, raw: &str) -> ResourceIdentity {
        ResourceIdentity::new(raw)
    }
}
