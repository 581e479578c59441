//! Synthesized template

use crate::resource::CfnResource;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// CloudFormation-format template handed to the provisioning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Resources in declaration order
    pub resources: IndexMap<String, CfnResource>,
}

impl Template {
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description,
            resources: IndexMap::new(),
        }
    }

    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources.get(logical_id)
    }

    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&String, &CfnResource)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
