//! autodsc-node: keeps Automation DSC node configurations in their desired state.
//!
//! - [`reconciler`]: create-or-update / read / delete / import against the service
//! - [`store`]: local identity bookkeeping between runs
//! - [`driver`]: picks the operation to run for a logical resource address

pub mod driver;
pub mod error;
pub mod identity;
pub mod reconciler;
pub mod spec;
pub mod store;

pub use driver::{ApplyReport, Driver, Plan, ResourceStatus};
pub use error::{Operation, ReconcileError};
pub use identity::ResourceIdentity;
pub use reconciler::{NodeConfigurationReconciler, ReadOutcome, Reconciler};
pub use spec::{DesiredSpec, ObservedState, SpecError, derive_parent_name};
pub use store::{SqliteStateStore, StateEntry, StateStore, StoreError};
