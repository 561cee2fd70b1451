//! Wire models for the `Microsoft.Automation` node configuration API (2015-10-31).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the configuration payload is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSourceType {
    #[serde(rename = "embeddedContent")]
    EmbeddedContent,
    #[serde(rename = "uri")]
    Uri,
}

/// Hash of a content payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash {
    pub algorithm: String,
    pub value: String,
}

/// Source of a node configuration's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSource {
    #[serde(rename = "type")]
    pub kind: ContentSourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
}

impl ContentSource {
    /// Inline content carried in the request body.
    pub fn embedded(content: impl Into<String>) -> Self {
        Self {
            kind: ContentSourceType::EmbeddedContent,
            value: Some(content.into()),
            version: None,
            hash: None,
        }
    }
}

/// Association to the DSC configuration a node configuration belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscConfigurationAssociationProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of a create-or-update (PUT) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfigurationParameters {
    pub source: ContentSource,
    pub name: String,
    pub configuration: DscConfigurationAssociationProperty,
}

impl NodeConfigurationParameters {
    /// Parameters for a node configuration with inline content.
    pub fn embedded(
        name: impl Into<String>,
        configuration_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source: ContentSource::embedded(content),
            name: name.into(),
            configuration: DscConfigurationAssociationProperty {
                name: Some(configuration_name.into()),
            },
        }
    }
}

/// Node configuration as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<DscConfigurationAssociationProperty>,
}

/// ARM error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
