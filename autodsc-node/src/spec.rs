//! Desired and observed shapes of a node configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separates the parent configuration name from the node name.
pub const PARENT_DELIMITER: char = '.';

const MAX_RESOURCE_GROUP_LEN: usize = 90;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error(
        "node configuration name {0:?} must be of the form <configuration>.<node>: no parent configuration name before '.'"
    )]
    NoParentConfiguration(String),

    #[error("resource group name {name:?} {reason}")]
    InvalidResourceGroup { name: String, reason: &'static str },
}

/// Configuration the caller wants to exist remotely.
///
/// `name`, `account_name` and `resource_group` identify the object and
/// cannot be changed in place; `content` is updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSpec {
    pub name: String,
    pub account_name: String,
    pub resource_group: String,
    pub content: String,
}

/// What a read reports back. Content is not exposed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    pub name: String,
    pub account_name: String,
    pub resource_group: String,
}

/// Name of the DSC configuration a node configuration belongs to: the
/// segment before the first delimiter.
pub fn derive_parent_name(name: &str) -> Result<&str, SpecError> {
    match name.split_once(PARENT_DELIMITER) {
        Some((parent, _)) if !parent.is_empty() => Ok(parent),
        _ => Err(SpecError::NoParentConfiguration(name.to_string())),
    }
}

pub fn validate_resource_group_name(name: &str) -> Result<(), SpecError> {
    let invalid = |reason| SpecError::InvalidResourceGroup {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(SpecError::Empty {
            field: "resource_group",
        });
    }
    if name.len() > MAX_RESOURCE_GROUP_LEN {
        return Err(invalid("may not exceed 90 characters in length"));
    }
    if name.ends_with('.') {
        return Err(invalid("may not end with a period"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')'))
    {
        return Err(invalid(
            "may only contain alphanumeric characters, dash, underscores, parentheses and periods",
        ));
    }
    Ok(())
}

impl DesiredSpec {
    pub fn new(
        name: impl Into<String>,
        account_name: impl Into<String>,
        resource_group: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            account_name: account_name.into(),
            resource_group: resource_group.into(),
            content: content.into(),
        }
    }

    /// Boundary checks. Content is opaque and never inspected.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name.is_empty() {
            return Err(SpecError::Empty { field: "name" });
        }
        if self.account_name.is_empty() {
            return Err(SpecError::Empty {
                field: "account_name",
            });
        }
        validate_resource_group_name(&self.resource_group)?;
        derive_parent_name(&self.name)?;
        Ok(())
    }

    pub fn parent_name(&self) -> Result<&str, SpecError> {
        derive_parent_name(&self.name)
    }

    /// Whether reaching this spec from `observed` needs delete + create.
    /// Resource group names are case-insensitive in ARM.
    pub fn requires_replacement(&self, observed: &ObservedState) -> bool {
        self.name != observed.name
            || self.account_name != observed.account_name
            || !self
                .resource_group
                .eq_ignore_ascii_case(&observed.resource_group)
    }
}
