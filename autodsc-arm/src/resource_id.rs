//! Azure Resource Manager identifiers.
//!
//! An ARM id is a path of key/value pairs:
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}/...`.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Provider namespace of automation resources.
pub const AUTOMATION_PROVIDER: &str = "Microsoft.Automation";

const ACCOUNTS_KEY: &str = "automationAccounts";
const NODE_CONFIGURATIONS_KEY: &str = "nodeConfigurations";

/// Errors raised while decomposing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    #[error("cannot parse Azure ID {0:?}: expected an absolute path")]
    NotAbsolute(String),

    #[error("the number of path segments is not divisible by 2 in {0:?}")]
    OddSegments(String),

    #[error("key/value cannot be empty strings, key: {key:?}, value: {value:?}")]
    EmptySegment { key: String, value: String },

    #[error("no subscription ID found in {0:?}")]
    MissingSubscription(String),

    #[error("no resource group name found in {0:?}")]
    MissingResourceGroup(String),

    #[error("expected provider {expected:?} in {id:?}, found {found:?}")]
    WrongProvider {
        id: String,
        expected: &'static str,
        found: Option<String>,
    },

    #[error("no {segment:?} segment found in {id:?}")]
    MissingSegment { id: String, segment: &'static str },
}

/// A generic, decomposed ARM identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: Option<String>,
    /// Remaining key/value pairs.
    pub path: BTreeMap<String, String>,
}

impl ResourceId {
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let path = if id.starts_with("http://") || id.starts_with("https://") {
            let url = reqwest::Url::parse(id)
                .map_err(|_| ResourceIdError::NotAbsolute(id.to_string()))?;
            url.path().to_string()
        } else if id.starts_with('/') {
            id.split(['?', '#']).next().unwrap_or_default().to_string()
        } else {
            return Err(ResourceIdError::NotAbsolute(id.to_string()));
        };

        let trimmed = path.trim_start_matches('/').trim_end_matches('/');
        let components: Vec<&str> = trimmed.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(ResourceIdError::OddSegments(trimmed.to_string()));
        }

        let mut subscription_id = None;
        let mut pairs = BTreeMap::new();
        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ResourceIdError::EmptySegment {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            // Only the first "subscriptions" pair names the subscription.
            if key == "subscriptions" && subscription_id.is_none() {
                subscription_id = Some(value.to_string());
            } else {
                pairs.insert(key.to_string(), value.to_string());
            }
        }

        let subscription_id =
            subscription_id.ok_or_else(|| ResourceIdError::MissingSubscription(trimmed.into()))?;
        let resource_group = pairs
            .remove("resourceGroups")
            .or_else(|| pairs.remove("resourcegroups"))
            .ok_or_else(|| ResourceIdError::MissingResourceGroup(trimmed.into()))?;
        let provider = pairs.remove("providers");

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path: pairs,
        })
    }
}

/// Typed identifier of a DSC node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeConfigurationId {
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
    pub name: String,
}

impl NodeConfigurationId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        account_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            account_name: account_name.into(),
            name: name.into(),
        }
    }

    /// Decompose an id string. Every segment must be present; there is no
    /// best-effort extraction.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let mut parsed = ResourceId::parse(id)?;

        match parsed.provider.as_deref() {
            Some(p) if p.eq_ignore_ascii_case(AUTOMATION_PROVIDER) => {}
            found => {
                return Err(ResourceIdError::WrongProvider {
                    id: id.to_string(),
                    expected: AUTOMATION_PROVIDER,
                    found: found.map(str::to_string),
                });
            }
        }

        let mut take = |segment: &'static str| {
            parsed
                .path
                .remove(segment)
                .ok_or_else(|| ResourceIdError::MissingSegment {
                    id: id.to_string(),
                    segment,
                })
        };
        let account_name = take(ACCOUNTS_KEY)?;
        let name = take(NODE_CONFIGURATIONS_KEY)?;

        Ok(Self {
            subscription_id: parsed.subscription_id,
            resource_group: parsed.resource_group,
            account_name,
            name,
        })
    }
}

impl fmt::Display for NodeConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}/{}/{}",
            self.subscription_id,
            self.resource_group,
            AUTOMATION_PROVIDER,
            ACCOUNTS_KEY,
            self.account_name,
            NODE_CONFIGURATIONS_KEY,
            self.name
        )
    }
}
