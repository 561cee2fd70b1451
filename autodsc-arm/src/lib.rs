//! autodsc-arm: Azure Resource Manager client for Automation DSC node configurations.
//!
//! Provides the wire models, ARM identifier parsing, and the
//! [`NodeConfigurationClient`] trait with an HTTP and an in-memory
//! implementation.

pub mod client;
pub mod error;
pub mod memory;
pub mod models;
pub mod resource_id;

pub use client::{
    ArmClientConfig, DEFAULT_API_VERSION, DEFAULT_ENDPOINT, HttpNodeConfigurationClient,
    NodeConfigurationClient,
};
pub use error::ArmError;
pub use memory::MemoryNodeConfigurationClient;
pub use models::{
    ContentSource, ContentSourceType, DscConfigurationAssociationProperty, NodeConfiguration,
    NodeConfigurationParameters,
};
pub use resource_id::{NodeConfigurationId, ResourceId, ResourceIdError};
