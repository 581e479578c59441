//! Route 53: hosted zone lookup and address records

use crate::lookup_env_props;
use homebody_cloud::{
    CfnResource, ConstructKind, ConstructPath, ContextLookup, LogicalId, LookupProvider, Stack,
};
use serde_json::{Value, json};

const DEFAULT_TTL_SECONDS: u32 = 1800;

#[derive(Debug, Clone)]
pub struct HostedZoneProviderProps {
    pub domain_name: String,
    pub private_zone: bool,
}

impl HostedZoneProviderProps {
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            private_zone: false,
        }
    }
}

/// An existing hosted zone, resolved through the lookup context
#[derive(Debug, Clone)]
pub struct HostedZone {
    pub path: ConstructPath,
    hosted_zone_id: String,
    zone_name: String,
}

impl HostedZone {
    /// Resolve a zone by domain name.
    ///
    /// Before the lookup is answered the zone id is `DUMMY`; the lookup is
    /// listed in the assembly manifest for the engine to fill in.
    pub fn from_lookup(stack: &mut Stack, id: &str, props: HostedZoneProviderProps) -> Self {
        let path = stack.path().child(id);
        let domain_name = props.domain_name.trim_end_matches('.').to_string();

        let mut lookup_props = lookup_env_props(stack);
        lookup_props.insert("domainName".to_string(), json!(domain_name));
        if props.private_zone {
            lookup_props.insert("privateZone".to_string(), json!(true));
        }
        let value = stack.lookup(ContextLookup::new(LookupProvider::HostedZone, lookup_props));

        let hosted_zone_id = value
            .get("Id")
            .and_then(Value::as_str)
            .map(|id| id.trim_start_matches("/hostedzone/").to_string())
            .unwrap_or_default();
        let zone_name = value
            .get("Name")
            .and_then(Value::as_str)
            .map(|name| name.trim_end_matches('.').to_string())
            .unwrap_or(domain_name);

        stack.register_construct(ConstructKind::HostedZoneLookup, path.clone());
        tracing::debug!(zone = %zone_name, id = %hosted_zone_id, "Resolved hosted zone");
        Self {
            path,
            hosted_zone_id,
            zone_name,
        }
    }

    pub fn hosted_zone_id(&self) -> &str {
        &self.hosted_zone_id
    }

    /// Zone name without the trailing dot
    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }
}

/// Values a record resolves to
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTarget {
    values: Vec<Value>,
}

impl RecordTarget {
    /// Addresses, literal or references such as an instance's public IP
    pub fn from_ip_addresses(addresses: impl IntoIterator<Item = Value>) -> Self {
        Self {
            values: addresses.into_iter().collect(),
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[derive(Debug, Clone)]
pub struct ARecordProps<'a> {
    pub zone: &'a HostedZone,
    pub target: RecordTarget,
    /// Relative or fully qualified; the zone apex when absent
    pub record_name: Option<String>,
    pub ttl_seconds: Option<u32>,
    pub comment: Option<String>,
}

impl<'a> ARecordProps<'a> {
    pub fn new(zone: &'a HostedZone, target: RecordTarget) -> Self {
        Self {
            zone,
            target,
            record_name: None,
            ttl_seconds: None,
            comment: None,
        }
    }
}

/// A declared IPv4 address record
#[derive(Debug, Clone)]
pub struct ARecord {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
    domain_name: String,
}

impl ARecord {
    pub fn new(stack: &mut Stack, id: &str, props: ARecordProps<'_>) -> Self {
        let path = stack.path().child(id);
        let domain_name =
            fully_qualified_name(props.record_name.as_deref(), props.zone.zone_name());

        let resource = CfnResource::new("AWS::Route53::RecordSet")
            .with_property("Comment", props.comment)
            .with_property("HostedZoneId", props.zone.hosted_zone_id())
            .with_property("Name", domain_name.as_str())
            .with_property("ResourceRecords", props.target.values.clone())
            .with_property(
                "TTL",
                props.ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS).to_string(),
            )
            .with_property("Type", "A");

        let logical_id = stack.add_resource(path.child("Resource"), resource);
        stack.register_construct(ConstructKind::DnsRecord, path.clone());
        Self {
            logical_id,
            path,
            domain_name,
        }
    }

    /// Fully qualified name, with trailing dot
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }
}

fn fully_qualified_name(record_name: Option<&str>, zone_name: &str) -> String {
    let Some(name) = record_name.filter(|n| !n.is_empty()) else {
        return format!("{}.", zone_name);
    };
    if name.ends_with('.') {
        return name.to_string();
    }
    let suffix = format!(".{}", zone_name);
    if name == zone_name || name.ends_with(&suffix) {
        format!("{}.", name)
    } else {
        format!("{}{}.", name, suffix)
    }
}
