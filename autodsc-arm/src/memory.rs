//! In-memory node configuration service.
//!
//! Behaves like the remote API (upsert on PUT, 404 on missing objects,
//! case-insensitive addressing) and can be steered into out-of-band
//! deletions and failures. Used by tests of code built on the client trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::NodeConfigurationClient;
use crate::error::{ArmError, Result};
use crate::models::{NodeConfiguration, NodeConfigurationParameters};
use crate::resource_id::NodeConfigurationId;

type Key = (String, String, String);

fn key(resource_group: &str, account_name: &str, name: &str) -> Key {
    (
        resource_group.to_ascii_lowercase(),
        account_name.to_ascii_lowercase(),
        name.to_ascii_lowercase(),
    )
}

struct StoredNode {
    node: NodeConfiguration,
    content: Option<String>,
}

struct Failure {
    /// `None` matches any operation.
    op: Option<String>,
    status: u16,
    message: String,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<Key, StoredNode>,
    calls: Vec<String>,
    omit_ids: bool,
    fail_next: Option<Failure>,
}

/// In-memory implementation of [`NodeConfigurationClient`].
pub struct MemoryNodeConfigurationClient {
    subscription_id: String,
    inner: Mutex<Inner>,
}

impl MemoryNodeConfigurationClient {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Delete an object behind the caller's back.
    pub async fn remove(&self, resource_group: &str, account_name: &str, name: &str) -> bool {
        let mut inner = self.inner.lock().await;
        inner
            .nodes
            .remove(&key(resource_group, account_name, name))
            .is_some()
    }

    /// Stored object, if any.
    pub async fn node(
        &self,
        resource_group: &str,
        account_name: &str,
        name: &str,
    ) -> Option<NodeConfiguration> {
        let inner = self.inner.lock().await;
        inner
            .nodes
            .get(&key(resource_group, account_name, name))
            .map(|s| s.node.clone())
    }

    /// Content last uploaded for an object.
    pub async fn content(&self, resource_group: &str, account_name: &str, name: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .nodes
            .get(&key(resource_group, account_name, name))
            .and_then(|s| s.content.clone())
    }

    /// Make every response omit the `id` field.
    pub async fn set_omit_ids(&self, omit: bool) {
        self.inner.lock().await.omit_ids = omit;
    }

    /// Fail the next call with the given status and message.
    pub async fn fail_next(&self, status: u16, message: impl Into<String>) {
        self.inner.lock().await.fail_next = Some(Failure {
            op: None,
            status,
            message: message.into(),
        });
    }

    /// Fail the next `op` call (`"PUT"`, `"GET"` or `"DELETE"`); other calls go through.
    pub async fn fail_next_on(&self, op: &str, status: u16, message: impl Into<String>) {
        self.inner.lock().await.fail_next = Some(Failure {
            op: Some(op.to_string()),
            status,
            message: message.into(),
        });
    }

    /// Calls received so far, as `"<OP> <name>"`.
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    /// Record a call and apply a pending injected failure.
    fn begin(inner: &mut Inner, cancel: &CancellationToken, op: &str, name: &str) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ArmError::Cancelled);
        }
        inner.calls.push(format!("{} {}", op, name));

        let applies = match &inner.fail_next {
            Some(failure) => failure.op.as_deref().is_none_or(|o| o == op),
            None => false,
        };
        if !applies {
            return Ok(());
        }
        match inner.fail_next.take() {
            Some(Failure { status: 404, .. }) => Err(ArmError::NotFound(name.to_string())),
            Some(Failure {
                status, message, ..
            }) => Err(ArmError::Api {
                status,
                code: "InjectedFailure".to_string(),
                message,
            }),
            None => Ok(()),
        }
    }

    fn respond(inner: &Inner, node: &NodeConfiguration) -> NodeConfiguration {
        let mut node = node.clone();
        if inner.omit_ids {
            node.id = None;
        }
        node
    }
}

#[async_trait]
impl NodeConfigurationClient for MemoryNodeConfigurationClient {
    async fn create_or_update(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
        parameters: &NodeConfigurationParameters,
    ) -> Result<NodeConfiguration> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, cancel, "PUT", name)?;

        let now = Utc::now();
        let id = NodeConfigurationId::new(&self.subscription_id, resource_group, account_name, name);
        let k = key(resource_group, account_name, name);
        let creation_time = inner
            .nodes
            .get(&k)
            .and_then(|s| s.node.creation_time)
            .unwrap_or(now);

        let node = NodeConfiguration {
            id: Some(id.to_string()),
            name: Some(parameters.name.clone()),
            kind: Some("Microsoft.Automation/AutomationAccounts/nodeConfigurations".to_string()),
            creation_time: Some(creation_time),
            last_modified_time: Some(now),
            configuration: Some(parameters.configuration.clone()),
        };
        inner.nodes.insert(
            k,
            StoredNode {
                node: node.clone(),
                content: parameters.source.value.clone(),
            },
        );

        Ok(Self::respond(&inner, &node))
    }

    async fn get(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
    ) -> Result<NodeConfiguration> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, cancel, "GET", name)?;

        match inner.nodes.get(&key(resource_group, account_name, name)) {
            Some(stored) => Ok(Self::respond(&inner, &stored.node)),
            None => Err(ArmError::NotFound(name.to_string())),
        }
    }

    async fn delete(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, cancel, "DELETE", name)?;

        match inner.nodes.remove(&key(resource_group, account_name, name)) {
            Some(_) => Ok(()),
            None => Err(ArmError::NotFound(name.to_string())),
        }
    }
}
