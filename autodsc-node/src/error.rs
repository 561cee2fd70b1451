//! Reconciliation error types.

use std::fmt;

use autodsc_arm::{ArmError, ResourceIdError};
use thiserror::Error;

use crate::spec::SpecError;
use crate::store::StoreError;

/// Remote operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateOrUpdate,
    /// The read-after-write that fetches the canonical identity.
    FetchIdentity,
    Read,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::CreateOrUpdate => "create or update",
            Operation::FetchIdentity => "read back",
            Operation::Read => "read",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Errors returned by the reconciler and driver.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Any remote failure other than "not found", passed through as-is.
    #[error("error issuing {op} request for Automation DSC node configuration '{name}': {source}")]
    Remote {
        op: Operation,
        name: String,
        #[source]
        source: ArmError,
    },

    /// The service reported success but handed out no usable identity.
    #[error("cannot read Automation DSC node configuration '{name}' (resource group {resource_group}) ID")]
    Integrity {
        name: String,
        resource_group: String,
    },

    /// A stored or caller-supplied identity that does not decompose.
    #[error("invalid node configuration identity: {0}")]
    InvalidIdentity(#[from] ResourceIdError),

    #[error("invalid desired state: {0}")]
    InvalidSpec(#[from] SpecError),

    #[error("state store: {0}")]
    Store(#[from] StoreError),

    /// Import pointed at an object that does not exist.
    #[error("cannot import non-existent remote object {0}")]
    ImportMissing(String),

    /// Import into an address that already tracks an object.
    #[error("{address} is already managed as {id}; destroy or forget it first")]
    AlreadyTracked { address: String, id: String },
}

impl ReconcileError {
    pub(crate) fn remote(op: Operation, name: &str, source: ArmError) -> Self {
        ReconcileError::Remote {
            op,
            name: name.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
