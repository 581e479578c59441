//! HomeBody AWS constructs
//!
//! Typed constructs that register their resources on a
//! [`homebody_cloud::Stack`] and hand back a handle for wiring them together.
//!
//! ```text
//! let vpc = Vpc::new(&mut stack, "HomeBody", VpcProps { .. });
//! let sg  = SecurityGroup::new(&mut stack, "WebDMZ", SecurityGroupProps { vpc: &vpc, .. });
//! sg.add_ingress_rule(&mut stack, Peer::any_ipv4(), Port::tcp(22), "Allow SSH Access");
//! ```
//!
//! Constructors never fail. Naming conflicts and missing lookups surface
//! when the stack is synthesized.

pub mod dynamodb;
pub mod ec2;
pub mod iam;
pub mod route53;

pub use dynamodb::{Attribute, AttributeType, BillingMode, Table, TableProps};
pub use ec2::{
    Instance, InstanceClass, InstanceProps, InstanceSize, InstanceType, Ipv4Cidr, KeyPair,
    KeyPairProps, KeyType, MachineImage, Peer, Port, Protocol, SecurityGroup, SecurityGroupProps,
    Subnet, SubnetConfiguration, SubnetSelection, SubnetType, Vpc, VpcProps,
};
pub use iam::{Effect, ManagedPolicy, PolicyStatement, Role, RoleProps, ServicePrincipal};
pub use route53::{ARecord, ARecordProps, HostedZone, HostedZoneProviderProps, RecordTarget};

use homebody_cloud::Stack;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Account and region props shared by every lookup
pub(crate) fn lookup_env_props(stack: &Stack) -> BTreeMap<String, Value> {
    let env = stack.env();
    let mut props = BTreeMap::new();
    props.insert(
        "account".to_string(),
        json!(env.account.as_deref().unwrap_or("unknown-account")),
    );
    props.insert(
        "region".to_string(),
        json!(env.region.as_deref().unwrap_or("unknown-region")),
    );
    props
}
