//! The stack builder
//!
//! A `Stack` is passed by `&mut` reference to every construct constructor,
//! which registers its resources on it and hands back a typed handle.

use crate::context::{Context, ContextLookup, MissingContext};
use crate::error::{CloudError, Result};
use crate::intrinsic::Pseudo;
use crate::path::{ConstructPath, LogicalId};
use crate::resource::{CfnResource, ConstructKind, ConstructRecord};
use crate::template::Template;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Target account and region of a stack. Either may be left open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            region: Some(region.into()),
        }
    }

    /// Neither account nor region is known at synth time
    pub fn is_agnostic(&self) -> bool {
        self.account.is_none() && self.region.is_none()
    }

    /// `aws://<account>/<region>`
    pub fn to_uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}

/// Optional deployment options of a stack
#[derive(Debug, Clone, Default)]
pub struct StackProps {
    pub env: Environment,
    pub description: Option<String>,
    /// Applied to every taggable resource at synth
    pub tags: BTreeMap<String, String>,
    pub termination_protection: bool,
}

#[derive(Debug, Clone)]
struct ResourceEntry {
    path: ConstructPath,
    resource: CfnResource,
}

/// Builder context collecting every declared resource of one stack
#[derive(Debug, Clone)]
pub struct Stack {
    id: String,
    props: StackProps,
    context: Context,
    resources: IndexMap<LogicalId, ResourceEntry>,
    constructs: Vec<ConstructRecord>,
    missing: Vec<MissingContext>,
    conflicts: Vec<String>,
}

impl Stack {
    pub fn new(id: impl Into<String>, props: StackProps, context: Context) -> Self {
        let id = id.into();
        tracing::debug!(stack = %id, env = %props.env.to_uri(), "Creating stack");
        Self {
            id,
            props,
            context,
            resources: IndexMap::new(),
            constructs: Vec::new(),
            missing: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn props(&self) -> &StackProps {
        &self.props
    }

    pub fn env(&self) -> &Environment {
        &self.props.env
    }

    /// Root path of the construct tree
    pub fn path(&self) -> ConstructPath {
        ConstructPath::root(&self.id)
    }

    /// Literal account id when known, otherwise `AWS::AccountId`
    pub fn account(&self) -> Value {
        match &self.props.env.account {
            Some(account) => Value::String(account.clone()),
            None => Pseudo::AccountId.value(),
        }
    }

    /// Literal region when known, otherwise `AWS::Region`
    pub fn region(&self) -> Value {
        match &self.props.env.region {
            Some(region) => Value::String(region.clone()),
            None => Pseudo::Region.value(),
        }
    }

    pub fn partition(&self) -> Value {
        Pseudo::Partition.value()
    }

    /// Register a resource at `path` and return its logical id.
    ///
    /// A second resource resolving to the same logical id is not stored; the
    /// conflict is reported by [`Stack::synthesize`].
    pub fn add_resource(&mut self, path: ConstructPath, resource: CfnResource) -> LogicalId {
        let logical_id = path.logical_id();
        if let Some(existing) = self.resources.get(&logical_id) {
            tracing::warn!(
                logical_id = %logical_id,
                existing = %existing.path,
                path = %path,
                "Logical id already in use"
            );
            self.conflicts.push(format!("{} ({})", path, logical_id));
            return logical_id;
        }

        tracing::debug!(
            logical_id = %logical_id,
            resource_type = %resource.resource_type,
            "Declared resource"
        );
        self.resources
            .insert(logical_id.clone(), ResourceEntry { path, resource });
        logical_id
    }

    pub fn resource(&self, id: &LogicalId) -> Option<&CfnResource> {
        self.resources.get(id).map(|e| &e.resource)
    }

    pub fn resource_mut(&mut self, id: &LogicalId) -> Option<&mut CfnResource> {
        self.resources.get_mut(id).map(|e| &mut e.resource)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &CfnResource)> {
        self.resources.iter().map(|(id, e)| (id, &e.resource))
    }

    /// Construct path and logical id of every resource, in declaration order
    pub fn logical_ids(&self) -> impl Iterator<Item = (&ConstructPath, &LogicalId)> {
        self.resources.iter().map(|(id, e)| (&e.path, id))
    }

    /// Record a top-level construct so the declaration can be inspected by entity
    pub fn register_construct(&mut self, kind: ConstructKind, path: ConstructPath) {
        if self.constructs.iter().any(|c| c.path == path) {
            tracing::warn!(path = %path, "Construct path already in use");
            self.conflicts.push(path.to_string());
            return;
        }
        self.constructs.push(ConstructRecord { kind, path });
    }

    pub fn constructs(&self) -> &[ConstructRecord] {
        &self.constructs
    }

    pub fn constructs_of(&self, kind: ConstructKind) -> Vec<&ConstructRecord> {
        self.constructs.iter().filter(|c| c.kind == kind).collect()
    }

    /// Resources declared under `path`
    pub fn resources_under(&self, path: &ConstructPath) -> Vec<(&LogicalId, &CfnResource)> {
        self.resources
            .iter()
            .filter(|(_, e)| e.path.starts_with(path))
            .map(|(id, e)| (id, &e.resource))
            .collect()
    }

    /// Answer a lookup from the context, or record it as missing and return
    /// the provider's dummy value.
    pub fn lookup(&mut self, lookup: ContextLookup) -> Value {
        let key = lookup.key();
        if let Some(value) = self.context.get(&key) {
            tracing::debug!(key = %key, "Resolved lookup from context");
            return value.clone();
        }

        if self.props.env.account.is_none() || self.props.env.region.is_none() {
            tracing::warn!(
                key = %key,
                "Lookup issued from a stack without a concrete account/region"
            );
        }

        tracing::info!(key = %key, "Lookup not in context, using dummy value");
        if !self.missing.iter().any(|m| m.key == key) {
            self.missing.push(MissingContext::from(&lookup));
        }
        lookup.dummy_value()
    }

    pub fn missing_context(&self) -> &[MissingContext] {
        &self.missing
    }

    /// Produce the template for this stack
    pub fn synthesize(&self) -> Result<Template> {
        if !self.conflicts.is_empty() {
            return Err(CloudError::DuplicateConstruct(self.conflicts.join(", ")));
        }

        let mut template = Template::new(self.props.description.clone());
        for (id, entry) in &self.resources {
            let mut resource = entry.resource.clone();
            if resource.is_taggable() {
                for (key, value) in &self.props.tags {
                    resource.set_tag(key, value.as_str());
                }
            }
            template.resources.insert(id.to_string(), resource);
        }

        tracing::debug!(
            stack = %self.id,
            resources = template.resources.len(),
            "Synthesized stack"
        );
        Ok(template)
    }
}
