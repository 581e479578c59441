//! Cloud assembly output
//!
//! Writes `<stack>.template.json` for every stack plus a `manifest.json`
//! describing them. The directory is the hand-off to the provisioning engine.

use crate::context::MissingContext;
use crate::error::Result;
use crate::stack::Stack;
use crate::template::Template;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const ASSEMBLY_VERSION: &str = "1.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";
const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Index of an assembly directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,

    /// Stack artifacts indexed by stack id
    pub artifacts: IndexMap<String, StackArtifact>,

    /// Lookups the engine has to answer before the templates are final
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<MissingContext>,
}

/// One stack entry of the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,

    /// `aws://<account>/<region>`
    pub environment: String,

    pub properties: StackArtifactProperties,

    /// Construct path → logical id
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifactProperties {
    pub template_file: String,
    pub termination_protection: bool,
}

/// Output directory writer
pub struct CloudAssembly {
    out_dir: PathBuf,
}

impl CloudAssembly {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn template_file_name(stack_id: &str) -> String {
        format!("{}.template.json", stack_id)
    }

    /// Synthesize every stack and write the assembly
    pub async fn write(&self, stacks: &[&Stack]) -> Result<Manifest> {
        let mut templates = Vec::with_capacity(stacks.len());
        for stack in stacks {
            templates.push((*stack, stack.synthesize()?));
        }

        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir).await?;
            tracing::debug!("Created assembly directory: {}", self.out_dir.display());
        }

        let mut manifest = Manifest {
            version: ASSEMBLY_VERSION.to_string(),
            artifacts: IndexMap::new(),
            missing: Vec::new(),
        };

        for (stack, template) in templates {
            let file_name = Self::template_file_name(stack.id());
            self.write_template(&file_name, &template).await?;

            manifest
                .artifacts
                .insert(stack.id().to_string(), artifact_for(stack, file_name));

            for missing in stack.missing_context() {
                if !manifest.missing.iter().any(|m| m.key == missing.key) {
                    manifest.missing.push(missing.clone());
                }
            }
        }

        let content = serde_json::to_string_pretty(&manifest)?;
        fs::write(self.out_dir.join(MANIFEST_FILE), content).await?;

        tracing::info!(
            out_dir = %self.out_dir.display(),
            stacks = manifest.artifacts.len(),
            missing = manifest.missing.len(),
            "Wrote cloud assembly"
        );
        Ok(manifest)
    }

    async fn write_template(&self, file_name: &str, template: &Template) -> Result<()> {
        let path = self.out_dir.join(file_name);
        fs::write(&path, template.to_json_pretty()?).await?;
        tracing::debug!("Wrote template: {}", path.display());
        Ok(())
    }

    /// Read back a previously written manifest
    pub async fn read_manifest(&self) -> Result<Manifest> {
        let content = fs::read_to_string(self.out_dir.join(MANIFEST_FILE)).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read back a previously written template
    pub async fn read_template(&self, stack_id: &str) -> Result<Template> {
        let path = self.out_dir.join(Self::template_file_name(stack_id));
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn artifact_for(stack: &Stack, template_file: String) -> StackArtifact {
    StackArtifact {
        artifact_type: STACK_ARTIFACT_TYPE.to_string(),
        environment: stack.env().to_uri(),
        properties: StackArtifactProperties {
            template_file,
            termination_protection: stack.props().termination_protection,
        },
        metadata: stack
            .logical_ids()
            .map(|(path, id)| (format!("/{}", path), id.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextLookup, LookupProvider};
    use crate::resource::CfnResource;
    use crate::stack::{Environment, StackProps};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn sample_stack() -> Stack {
        let props = StackProps {
            env: Environment::new("123456789012", "us-east-1"),
            termination_protection: true,
            ..Default::default()
        };
        let mut stack = Stack::new("InfraStack", props, Context::new());
        let path = stack.path().child("HomeBody").child("Resource");
        stack.add_resource(
            path,
            CfnResource::new("AWS::EC2::VPC").with_property("CidrBlock", "10.0.0.0/24"),
        );
        let mut props = BTreeMap::new();
        props.insert("domainName".to_string(), json!("ask-frank.shop"));
        stack.lookup(ContextLookup::new(LookupProvider::HostedZone, props));
        stack
    }

    #[tokio::test]
    async fn test_write_assembly() {
        let temp_dir = tempdir().unwrap();
        let assembly = CloudAssembly::new(temp_dir.path().join("homebody.out"));
        let stack = sample_stack();

        let manifest = assembly.write(&[&stack]).await.unwrap();
        assert_eq!(manifest.artifacts.len(), 1);
        assert_eq!(manifest.missing.len(), 1);

        let artifact = &manifest.artifacts["InfraStack"];
        assert_eq!(artifact.environment, "aws://123456789012/us-east-1");
        assert_eq!(artifact.properties.template_file, "InfraStack.template.json");
        assert!(artifact.properties.termination_protection);
        assert!(artifact.metadata.contains_key("/InfraStack/HomeBody/Resource"));

        let template = assembly.read_template("InfraStack").await.unwrap();
        assert_eq!(template.resources_of_type("AWS::EC2::VPC").len(), 1);

        let read_back = assembly.read_manifest().await.unwrap();
        assert_eq!(read_back.missing[0].key, manifest.missing[0].key);
    }

    #[tokio::test]
    async fn test_write_fails_on_conflict() {
        let temp_dir = tempdir().unwrap();
        let assembly = CloudAssembly::new(temp_dir.path());
        let mut stack = sample_stack();
        let path = stack.path().child("HomeBody").child("Resource");
        stack.add_resource(path, CfnResource::new("AWS::EC2::VPC"));

        assert!(assembly.write(&[&stack]).await.is_err());
        assert!(!temp_dir.path().join(MANIFEST_FILE).exists());
    }
}
