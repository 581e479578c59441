//! Construct paths and the logical IDs derived from them

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Path component hidden from both the digest and the readable part of an ID.
const HIDDEN_ID: &str = "Default";

/// Path component hidden from the readable part of an ID only.
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

/// Upper bound of the readable part of a logical ID.
const MAX_HUMAN_LEN: usize = 240;

/// Location of a construct inside the stack tree, e.g. `InfraStack/HomeBody/Resource`.
///
/// The first component is always the stack id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    pub fn root(stack_id: impl Into<String>) -> Self {
        Self(vec![stack_id.into()])
    }

    pub fn child(&self, id: impl Into<String>) -> Self {
        let mut components = self.0.clone();
        components.push(id.into());
        Self(components)
    }

    /// The last component of the path
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Whether `self` is `other` or one of its descendants
    pub fn starts_with(&self, other: &ConstructPath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Derive the template key for a resource living at this path.
    ///
    /// Components below the stack are concatenated into a readable prefix and
    /// suffixed with the first 8 hex digits of the MD5 of the full relative
    /// path, so renaming any ancestor changes the ID.
    pub fn logical_id(&self) -> LogicalId {
        let components: Vec<&str> = self
            .0
            .iter()
            .skip(1)
            .map(String::as_str)
            .filter(|c| *c != HIDDEN_ID)
            .collect();

        if components.len() == 1 {
            return LogicalId(sanitize(components[0]));
        }

        let digest = format!("{:x}", md5::compute(components.join("/")));
        let hash = digest[..8].to_uppercase();

        let mut human: Vec<&str> = Vec::with_capacity(components.len());
        for component in components {
            if component == HIDDEN_FROM_HUMAN_ID {
                continue;
            }
            if human.last() == Some(&component) {
                continue;
            }
            human.push(component);
        }

        let mut readable = sanitize(&human.concat());
        readable.truncate(MAX_HUMAN_LEN);
        LogicalId(format!("{}{}", readable, hash))
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl Serialize for ConstructPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Key of a resource inside the synthesized template
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{"Ref": id}`
    pub fn reference(&self) -> serde_json::Value {
        crate::intrinsic::reference(&self.0)
    }

    /// `{"Fn::GetAtt": [id, attribute]}`
    pub fn get_att(&self, attribute: &str) -> serde_json::Value {
        crate::intrinsic::get_att(&self.0, attribute)
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = ConstructPath::root("InfraStack")
            .child("HomeBody")
            .child("Resource");
        assert_eq!(path.to_string(), "InfraStack/HomeBody/Resource");
        assert_eq!(path.id(), "Resource");
    }

    #[test]
    fn test_single_component_is_verbatim() {
        let path = ConstructPath::root("InfraStack").child("MyBucket");
        assert_eq!(path.logical_id().as_str(), "MyBucket");
    }

    #[test]
    fn test_resource_is_hidden_from_readable_part() {
        let id = ConstructPath::root("InfraStack")
            .child("HomeBody")
            .child("Resource")
            .logical_id();
        let id = id.as_str();
        assert!(id.starts_with("HomeBody"));
        assert_eq!(id.len(), "HomeBody".len() + 8);
        assert!(
            id["HomeBody".len()..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_logical_id_is_stable_and_path_sensitive() {
        let a = ConstructPath::root("InfraStack")
            .child("HomeBody")
            .child("PublicSubnet1")
            .child("Subnet");
        let b = ConstructPath::root("InfraStack")
            .child("HomeBody")
            .child("PublicSubnet2")
            .child("Subnet");

        assert_eq!(a.logical_id(), a.clone().logical_id());
        assert_ne!(a.logical_id(), b.logical_id());
        assert!(a.logical_id().as_str().starts_with("HomeBodyPublicSubnet1Subnet"));
    }

    #[test]
    fn test_stack_id_does_not_affect_logical_id() {
        let a = ConstructPath::root("InfraStack").child("WebDMZ").child("Resource");
        let b = ConstructPath::root("OtherStack").child("WebDMZ").child("Resource");
        assert_eq!(a.logical_id(), b.logical_id());
    }

    #[test]
    fn test_default_component_is_ignored() {
        let a = ConstructPath::root("S").child("Table").child("Default");
        assert_eq!(a.logical_id().as_str(), "Table");
    }

    #[test]
    fn test_non_alphanumeric_is_stripped() {
        let id = ConstructPath::root("S").child("web-server_01").logical_id();
        assert_eq!(id.as_str(), "webserver01");
    }

    #[test]
    fn test_starts_with() {
        let vpc = ConstructPath::root("S").child("HomeBody");
        let subnet = vpc.child("PublicSubnet1");
        assert!(subnet.starts_with(&vpc));
        assert!(!vpc.starts_with(&subnet));
    }

    #[test]
    fn test_reference_and_get_att() {
        let id = LogicalId::new("WebServer1234ABCD");
        assert_eq!(
            id.reference(),
            serde_json::json!({ "Ref": "WebServer1234ABCD" })
        );
        assert_eq!(
            id.get_att("PublicIp"),
            serde_json::json!({ "Fn::GetAtt": ["WebServer1234ABCD", "PublicIp"] })
        );
    }
}
