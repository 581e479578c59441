//! Declared resources and the constructs that own them

use crate::path::{ConstructPath, LogicalId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Resource types that accept a `Tags` list of `{Key, Value}` pairs
const TAGGABLE_TYPES: &[&str] = &[
    "AWS::DynamoDB::Table",
    "AWS::EC2::EIP",
    "AWS::EC2::Instance",
    "AWS::EC2::InternetGateway",
    "AWS::EC2::KeyPair",
    "AWS::EC2::NatGateway",
    "AWS::EC2::RouteTable",
    "AWS::EC2::SecurityGroup",
    "AWS::EC2::Subnet",
    "AWS::EC2::VPC",
    "AWS::IAM::Role",
];

/// A single resource entry of the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResource {
    /// Resource type (e.g., "AWS::EC2::VPC")
    #[serde(rename = "Type")]
    pub resource_type: String,

    /// Resource properties, passed through to the engine as-is
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    /// Explicit ordering constraints on top of implicit references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,
}

impl CfnResource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
        }
    }

    /// Set a property. `null` values are skipped so optional props can be passed straight through.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if !value.is_null() {
            self.properties.insert(key.into(), value);
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Append to an array property, creating it if missing
    pub fn push_property(&mut self, key: &str, value: Value) {
        let entry = self
            .properties
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(value);
        }
    }

    pub fn with_dependency(mut self, id: &LogicalId) -> Self {
        self.add_dependency(id);
        self
    }

    pub fn add_dependency(&mut self, id: &LogicalId) {
        if !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
    }

    /// Apply the same policy on replacement and deletion
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.update_replace_policy = Some(policy);
        self.deletion_policy = Some(policy);
        self
    }

    pub fn is_taggable(&self) -> bool {
        TAGGABLE_TYPES.contains(&self.resource_type.as_str())
    }

    /// Insert or replace a tag. The list stays sorted by key.
    pub fn set_tag(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let entry = self
            .properties
            .entry("Tags".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(tags) = entry else {
            return;
        };

        tags.retain(|t| t.get("Key").and_then(Value::as_str) != Some(key));
        tags.push(json!({ "Key": key, "Value": value }));
        tags.sort_by(|a, b| {
            let ka = a.get("Key").and_then(Value::as_str).unwrap_or_default();
            let kb = b.get("Key").and_then(Value::as_str).unwrap_or_default();
            ka.cmp(kb)
        });
    }

    /// Get a tag value by key
    pub fn tag(&self, key: &str) -> Option<&Value> {
        self.properties
            .get("Tags")?
            .as_array()?
            .iter()
            .find(|t| t.get("Key").and_then(Value::as_str) == Some(key))
            .and_then(|t| t.get("Value"))
    }

    /// Get a property as a specific type
    pub fn get_property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// What happens to the physical resource when it leaves the declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    Retain,
    Delete,
    Snapshot,
}

/// Entity kind of a top-level construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructKind {
    Network,
    KeyPair,
    FirewallRuleSet,
    ExecutionRole,
    Instance,
    Table,
    HostedZoneLookup,
    DnsRecord,
}

impl std::fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructKind::Network => write!(f, "network"),
            ConstructKind::KeyPair => write!(f, "key-pair"),
            ConstructKind::FirewallRuleSet => write!(f, "firewall-rule-set"),
            ConstructKind::ExecutionRole => write!(f, "execution-role"),
            ConstructKind::Instance => write!(f, "instance"),
            ConstructKind::Table => write!(f, "table"),
            ConstructKind::HostedZoneLookup => write!(f, "hosted-zone-lookup"),
            ConstructKind::DnsRecord => write!(f, "dns-record"),
        }
    }
}

/// A registered top-level construct
#[derive(Debug, Clone, Serialize)]
pub struct ConstructRecord {
    pub kind: ConstructKind,
    pub path: ConstructPath,
}
