//! Lookup context for values only the provider account can answer
//!
//! Manages the `homebody.context.json` file that caches lookup results
//! (hosted zone ids, machine image ids) between synth runs.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const CONTEXT_VERSION: u32 = 1;
pub const CONTEXT_FILE: &str = "homebody.context.json";
const CONTEXT_BACKUP: &str = "homebody.context.json.backup";

/// Cached lookup values indexed by lookup key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Kind of provider lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupProvider {
    /// Route 53 hosted zone by domain name
    HostedZone,
    /// Machine image by filters
    Ami,
}

impl LookupProvider {
    pub fn name(&self) -> &'static str {
        match self {
            LookupProvider::HostedZone => "hosted-zone",
            LookupProvider::Ami => "ami",
        }
    }

    /// Placeholder used in the template until the lookup is answered
    pub fn dummy_value(&self, props: &BTreeMap<String, Value>) -> Value {
        match self {
            LookupProvider::HostedZone => {
                let name = props
                    .get("domainName")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                json!({ "Id": "DUMMY", "Name": format!("{}.", name.trim_end_matches('.')) })
            }
            LookupProvider::Ami => json!("ami-1234"),
        }
    }
}

/// A lookup request issued while building a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextLookup {
    pub provider: LookupProvider,
    pub props: BTreeMap<String, Value>,
}

impl ContextLookup {
    pub fn new(provider: LookupProvider, props: BTreeMap<String, Value>) -> Self {
        Self { provider, props }
    }

    /// Deterministic cache key, e.g.
    /// `hosted-zone:account=123:domainName=example.com:region=us-east-1`.
    ///
    /// Nested props are flattened with dotted paths and array indices.
    pub fn key(&self) -> String {
        let mut flat = Vec::new();
        for (k, v) in &self.props {
            flatten(k, v, &mut flat);
        }
        flat.sort();

        let mut key = self.provider.name().to_string();
        for (k, v) in flat {
            key.push(':');
            key.push_str(&k);
            key.push('=');
            key.push_str(&v);
        }
        key
    }

    pub fn dummy_value(&self) -> Value {
        self.provider.dummy_value(&self.props)
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten(&format!("{}.{}", prefix, k), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(&format!("{}.{}", prefix, i), v, out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

/// A lookup the context could not answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingContext {
    pub key: String,
    pub provider: LookupProvider,
    pub props: BTreeMap<String, Value>,
}

impl From<&ContextLookup> for MissingContext {
    fn from(lookup: &ContextLookup) -> Self {
        Self {
            key: lookup.key(),
            provider: lookup.provider,
            props: lookup.props.clone(),
        }
    }
}

/// On-disk layout of the context file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContextFile {
    version: u32,
    updated_at: DateTime<Utc>,
    values: Context,
}

/// Reads and writes the context file of a project
pub struct ContextStore {
    /// Project root directory
    project_root: PathBuf,
}

impl ContextStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    /// Get the context file path
    pub fn path(&self) -> PathBuf {
        self.project_root.join(CONTEXT_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.project_root.join(CONTEXT_BACKUP)
    }

    /// Load the stored context; a missing file is an empty context
    pub async fn load(&self) -> Result<Context> {
        let path = self.path();
        if !path.exists() {
            tracing::debug!("Context file not found, returning empty context");
            return Ok(Context::new());
        }

        let content = fs::read_to_string(&path).await?;
        let file: ContextFile = serde_json::from_str(&content)?;

        if file.version > CONTEXT_VERSION {
            return Err(CloudError::ContextError(format!(
                "Context file version {} is newer than supported version {}",
                file.version, CONTEXT_VERSION
            )));
        }

        tracing::debug!("Loaded context with {} values", file.values.len());
        Ok(file.values)
    }

    /// Save the context, keeping the previous file as a backup
    pub async fn save(&self, context: &Context) -> Result<()> {
        if !self.project_root.exists() {
            fs::create_dir_all(&self.project_root).await?;
        }

        let path = self.path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created context backup");
        }

        let file = ContextFile {
            version: CONTEXT_VERSION,
            updated_at: Utc::now(),
            values: context.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved context with {} values", context.len());
        Ok(())
    }
}
