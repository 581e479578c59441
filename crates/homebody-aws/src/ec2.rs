//! EC2 constructs: network, firewall, key pair, instance

use crate::iam::{PolicyStatement, Role, RoleProps, ServicePrincipal};
use crate::lookup_env_props;
use homebody_cloud::intrinsic::{base64, get_azs, join, select};
use homebody_cloud::{
    CfnResource, CloudError, ConstructKind, ConstructPath, ContextLookup, LogicalId,
    LookupProvider, Stack,
};
use serde_json::{Value, json};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

const ANY_IPV4: &str = "0.0.0.0/0";
const ANY_IPV6: &str = "::/0";
const DEFAULT_USER_DATA: &str = "#!/bin/bash";

// ============ CIDR ============

/// An IPv4 network block such as `10.0.0.0/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Host bits of `network` are cleared; `prefix` is capped at 32.
    pub fn new(network: Ipv4Addr, prefix: u8) -> Self {
        let prefix = prefix.min(32);
        let mask = if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        };
        Self {
            network: Ipv4Addr::from(u32::from(network) & mask),
            prefix,
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Divide the block into `count` equal consecutive blocks.
    ///
    /// `count` is rounded up to a power of two for sizing. Blocks never
    /// extend past this one, so fewer than `count` come back once the
    /// prefix reaches /32.
    pub fn split(&self, count: usize) -> Vec<Ipv4Cidr> {
        if count == 0 {
            return Vec::new();
        }
        let bits = count.next_power_of_two().trailing_zeros() as u8;
        let prefix = self.prefix.saturating_add(bits).min(32);
        let block = 1u64 << (32 - prefix);
        let base = u64::from(u32::from(self.network));
        let available = 1u64 << (prefix - self.prefix);

        (0..(count as u64).min(available))
            .map(|i| Ipv4Cidr {
                network: Ipv4Addr::from((base + block * i) as u32),
                prefix,
            })
            .collect()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| CloudError::InvalidConfig(format!("CIDR requires a prefix: {}", s)))?;
        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| CloudError::InvalidConfig(format!("Invalid IPv4 address: {}", addr)))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| CloudError::InvalidConfig(format!("Invalid prefix length: {}", s)))?;
        Ok(Self::new(network, prefix))
    }
}

// ============ Network ============

/// Role of a subnet inside the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetType {
    /// Routed to the internet gateway; instances get a public IP
    Public,
    /// Outbound through a NAT gateway in the same AZ
    PrivateWithEgress,
    /// No route out of the network
    PrivateIsolated,
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetType::Public => write!(f, "Public"),
            SubnetType::PrivateWithEgress => write!(f, "Private"),
            SubnetType::PrivateIsolated => write!(f, "Isolated"),
        }
    }
}

/// One subnet group, repeated in every AZ
#[derive(Debug, Clone)]
pub struct SubnetConfiguration {
    pub name: String,
    pub subnet_type: SubnetType,
}

impl SubnetConfiguration {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType) -> Self {
        Self {
            name: name.into(),
            subnet_type,
        }
    }
}

/// Public + private-with-egress in every AZ
pub fn default_subnet_configuration() -> Vec<SubnetConfiguration> {
    vec![
        SubnetConfiguration::new("Public", SubnetType::Public),
        SubnetConfiguration::new("Private", SubnetType::PrivateWithEgress),
    ]
}

#[derive(Debug, Clone)]
pub struct VpcProps {
    pub ip_addresses: Ipv4Cidr,
    pub max_azs: usize,
    pub subnet_configuration: Vec<SubnetConfiguration>,
    /// NAT gateways to create; defaults to one per AZ
    pub nat_gateways: Option<usize>,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            ip_addresses: Ipv4Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 16),
            max_azs: 2,
            subnet_configuration: default_subnet_configuration(),
            nat_gateways: None,
            enable_dns_hostnames: true,
            enable_dns_support: true,
        }
    }
}

/// A declared subnet
#[derive(Debug, Clone)]
pub struct Subnet {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
    pub subnet_type: SubnetType,
    pub cidr: Ipv4Cidr,
    pub az_index: usize,
    pub route_table: LogicalId,
}

impl Subnet {
    pub fn subnet_id(&self) -> Value {
        self.logical_id.reference()
    }

    pub fn availability_zone(&self) -> Value {
        select(self.az_index, get_azs(""))
    }
}

/// Which subnets of a network to place something in
#[derive(Debug, Clone, Copy, Default)]
pub struct SubnetSelection {
    /// `None` prefers private-with-egress, then isolated, then public
    pub subnet_type: Option<SubnetType>,
}

impl SubnetSelection {
    pub fn of_type(subnet_type: SubnetType) -> Self {
        Self {
            subnet_type: Some(subnet_type),
        }
    }
}

/// A declared network with its subnets
#[derive(Debug, Clone)]
pub struct Vpc {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
    cidr: Ipv4Cidr,
    subnets: Vec<Subnet>,
    internet_gateway: Option<LogicalId>,
    nat_gateways: Vec<LogicalId>,
}

impl Vpc {
    pub fn new(stack: &mut Stack, id: &str, props: VpcProps) -> Self {
        let path = stack.path().child(id);
        let name_tag = path.to_string();

        let mut vpc_resource = CfnResource::new("AWS::EC2::VPC")
            .with_property("CidrBlock", props.ip_addresses.to_string())
            .with_property("EnableDnsHostnames", props.enable_dns_hostnames)
            .with_property("EnableDnsSupport", props.enable_dns_support)
            .with_property("InstanceTenancy", "default");
        vpc_resource.set_tag("Name", name_tag.as_str());
        let logical_id = stack.add_resource(path.child("Resource"), vpc_resource);
        stack.register_construct(ConstructKind::Network, path.clone());

        let mut vpc = Vpc {
            logical_id,
            path,
            cidr: props.ip_addresses,
            subnets: Vec::new(),
            internet_gateway: None,
            nat_gateways: Vec::new(),
        };

        let az_count = props.max_azs.max(1);
        let blocks = props
            .ip_addresses
            .split(az_count * props.subnet_configuration.len());
        let mut blocks = blocks.into_iter();

        let has_public = props
            .subnet_configuration
            .iter()
            .any(|c| c.subnet_type == SubnetType::Public);
        let needs_nat = props
            .subnet_configuration
            .iter()
            .any(|c| c.subnet_type == SubnetType::PrivateWithEgress);
        let nat_count = if has_public && needs_nat {
            props.nat_gateways.unwrap_or(az_count).min(az_count)
        } else {
            0
        };

        let gateway_attachment = if has_public {
            Some(vpc.declare_internet_gateway(stack))
        } else {
            None
        };

        // Public groups first so NAT gateways exist before private routes need them
        let mut ordered: Vec<(usize, &SubnetConfiguration)> =
            props.subnet_configuration.iter().enumerate().collect();
        ordered.sort_by_key(|(_, c)| c.subnet_type != SubnetType::Public);

        let mut cidrs: Vec<Vec<Ipv4Cidr>> = props
            .subnet_configuration
            .iter()
            .map(|_| (0..az_count).filter_map(|_| blocks.next()).collect())
            .collect();

        for (index, config) in ordered {
            let group_cidrs = std::mem::take(&mut cidrs[index]);
            for (az, cidr) in group_cidrs.into_iter().enumerate() {
                let subnet = vpc.declare_subnet(stack, config, az, cidr);
                match config.subnet_type {
                    SubnetType::Public => {
                        if let Some(attachment) = &gateway_attachment {
                            vpc.declare_public_egress(stack, &subnet, attachment, az < nat_count);
                        }
                    }
                    SubnetType::PrivateWithEgress => vpc.declare_private_egress(stack, &subnet),
                    SubnetType::PrivateIsolated => {}
                }
                vpc.subnets.push(subnet);
            }
        }

        tracing::debug!(
            vpc = %vpc.path,
            cidr = %vpc.cidr,
            subnets = vpc.subnets.len(),
            nat_gateways = vpc.nat_gateways.len(),
            "Declared network"
        );
        vpc
    }

    fn declare_internet_gateway(&mut self, stack: &mut Stack) -> LogicalId {
        let mut igw = CfnResource::new("AWS::EC2::InternetGateway");
        igw.set_tag("Name", self.path.to_string());
        let igw_id = stack.add_resource(self.path.child("IGW"), igw);

        let attachment = CfnResource::new("AWS::EC2::VPCGatewayAttachment")
            .with_property("InternetGatewayId", igw_id.reference())
            .with_property("VpcId", self.vpc_id());
        let attachment_id = stack.add_resource(self.path.child("VPCGW"), attachment);

        self.internet_gateway = Some(igw_id);
        attachment_id
    }

    fn declare_subnet(
        &self,
        stack: &mut Stack,
        config: &SubnetConfiguration,
        az_index: usize,
        cidr: Ipv4Cidr,
    ) -> Subnet {
        let path = self.path.child(format!("{}Subnet{}", config.name, az_index + 1));
        let name_tag = path.to_string();

        let mut subnet = CfnResource::new("AWS::EC2::Subnet")
            .with_property("AvailabilityZone", select(az_index, get_azs("")))
            .with_property("CidrBlock", cidr.to_string())
            .with_property(
                "MapPublicIpOnLaunch",
                config.subnet_type == SubnetType::Public,
            )
            .with_property("VpcId", self.vpc_id());
        subnet.set_tag("Name", name_tag.as_str());
        subnet.set_tag("homebody:subnet-name", config.name.as_str());
        subnet.set_tag("homebody:subnet-type", config.subnet_type.to_string());
        let logical_id = stack.add_resource(path.child("Subnet"), subnet);

        let mut route_table =
            CfnResource::new("AWS::EC2::RouteTable").with_property("VpcId", self.vpc_id());
        route_table.set_tag("Name", name_tag.as_str());
        let route_table_id = stack.add_resource(path.child("RouteTable"), route_table);

        let association = CfnResource::new("AWS::EC2::SubnetRouteTableAssociation")
            .with_property("RouteTableId", route_table_id.reference())
            .with_property("SubnetId", logical_id.reference());
        stack.add_resource(path.child("RouteTableAssociation"), association);

        Subnet {
            logical_id,
            path,
            subnet_type: config.subnet_type,
            cidr,
            az_index,
            route_table: route_table_id,
        }
    }

    fn declare_public_egress(
        &mut self,
        stack: &mut Stack,
        subnet: &Subnet,
        gateway_attachment: &LogicalId,
        with_nat: bool,
    ) {
        let Some(igw) = &self.internet_gateway else {
            return;
        };

        let route = CfnResource::new("AWS::EC2::Route")
            .with_property("DestinationCidrBlock", ANY_IPV4)
            .with_property("GatewayId", igw.reference())
            .with_property("RouteTableId", subnet.route_table.reference())
            .with_dependency(gateway_attachment);
        let route_id = stack.add_resource(subnet.path.child("DefaultRoute"), route);

        if !with_nat {
            return;
        }

        let mut eip = CfnResource::new("AWS::EC2::EIP").with_property("Domain", "vpc");
        eip.set_tag("Name", subnet.path.to_string());
        let eip_id = stack.add_resource(subnet.path.child("EIP"), eip);

        let association_id = subnet.path.child("RouteTableAssociation").logical_id();
        let mut nat = CfnResource::new("AWS::EC2::NatGateway")
            .with_property("AllocationId", eip_id.get_att("AllocationId"))
            .with_property("SubnetId", subnet.subnet_id())
            .with_dependency(&route_id)
            .with_dependency(&association_id);
        nat.set_tag("Name", subnet.path.to_string());
        let nat_id = stack.add_resource(subnet.path.child("NATGateway"), nat);
        self.nat_gateways.push(nat_id);
    }

    fn declare_private_egress(&self, stack: &mut Stack, subnet: &Subnet) {
        if self.nat_gateways.is_empty() {
            tracing::warn!(subnet = %subnet.path, "No NAT gateway available, subnet has no egress route");
            return;
        }
        let nat = &self.nat_gateways[subnet.az_index % self.nat_gateways.len()];
        let route = CfnResource::new("AWS::EC2::Route")
            .with_property("DestinationCidrBlock", ANY_IPV4)
            .with_property("NatGatewayId", nat.reference())
            .with_property("RouteTableId", subnet.route_table.reference());
        stack.add_resource(subnet.path.child("DefaultRoute"), route);
    }

    pub fn vpc_id(&self) -> Value {
        self.logical_id.reference()
    }

    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    pub fn public_subnets(&self) -> Vec<&Subnet> {
        self.of_type(SubnetType::Public)
    }

    pub fn private_subnets(&self) -> Vec<&Subnet> {
        self.of_type(SubnetType::PrivateWithEgress)
    }

    pub fn internet_gateway(&self) -> Option<&LogicalId> {
        self.internet_gateway.as_ref()
    }

    fn of_type(&self, subnet_type: SubnetType) -> Vec<&Subnet> {
        let mut subnets: Vec<&Subnet> = self
            .subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .collect();
        subnets.sort_by_key(|s| s.az_index);
        subnets
    }

    /// Subnets matching `selection`, ordered by AZ
    pub fn select_subnets(&self, selection: &SubnetSelection) -> Vec<&Subnet> {
        if let Some(subnet_type) = selection.subnet_type {
            return self.of_type(subnet_type);
        }
        [
            SubnetType::PrivateWithEgress,
            SubnetType::PrivateIsolated,
            SubnetType::Public,
        ]
        .into_iter()
        .map(|t| self.of_type(t))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
    }
}

// ============ Firewall ============

/// Traffic source of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    AnyIpv4,
    AnyIpv6,
    Ipv4(Ipv4Cidr),
}

impl Peer {
    pub fn any_ipv4() -> Self {
        Peer::AnyIpv4
    }

    pub fn any_ipv6() -> Self {
        Peer::AnyIpv6
    }

    pub fn ipv4(cidr: Ipv4Cidr) -> Self {
        Peer::Ipv4(cidr)
    }

    fn rule_field(&self) -> (&'static str, String) {
        match self {
            Peer::AnyIpv4 => ("CidrIp", ANY_IPV4.to_string()),
            Peer::AnyIpv6 => ("CidrIpv6", ANY_IPV6.to_string()),
            Peer::Ipv4(cidr) => ("CidrIp", cidr.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    All,
}

impl Protocol {
    fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::All => "-1",
        }
    }
}

/// Protocol and port range of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub protocol: Protocol,
    pub from_port: Option<u16>,
    pub to_port: Option<u16>,
}

impl Port {
    pub fn tcp(port: u16) -> Self {
        Self::tcp_range(port, port)
    }

    pub fn tcp_range(from: u16, to: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port: Some(from),
            to_port: Some(to),
        }
    }

    pub fn udp(port: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            from_port: Some(port),
            to_port: Some(port),
        }
    }

    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from_port: None,
            to_port: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroupProps<'a> {
    pub vpc: &'a Vpc,
    pub description: Option<String>,
    pub allow_all_outbound: bool,
    pub security_group_name: Option<String>,
}

/// A declared firewall rule-set
#[derive(Debug, Clone)]
pub struct SecurityGroup {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
}

impl SecurityGroup {
    pub fn new(stack: &mut Stack, id: &str, props: SecurityGroupProps<'_>) -> Self {
        let path = stack.path().child(id);
        let description = props
            .description
            .clone()
            .unwrap_or_else(|| path.to_string());

        let egress = if props.allow_all_outbound {
            json!([{
                "CidrIp": ANY_IPV4,
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1"
            }])
        } else {
            // Matches nothing; an empty list would let the engine add allow-all
            json!([{
                "CidrIp": "255.255.255.255/32",
                "Description": "Disallow all traffic",
                "FromPort": 252,
                "IpProtocol": "icmp",
                "ToPort": 86
            }])
        };

        let mut resource = CfnResource::new("AWS::EC2::SecurityGroup")
            .with_property("GroupDescription", description)
            .with_property("SecurityGroupEgress", egress)
            .with_property("VpcId", props.vpc.vpc_id());
        if let Some(name) = props.security_group_name {
            resource.set_property("GroupName", name);
        }

        let logical_id = stack.add_resource(path.child("Resource"), resource);
        stack.register_construct(ConstructKind::FirewallRuleSet, path.clone());
        Self { logical_id, path }
    }

    /// Allow inbound traffic. Identical rules are declared once.
    pub fn add_ingress_rule(&self, stack: &mut Stack, peer: Peer, port: Port, description: &str) {
        let (source_key, source) = peer.rule_field();
        let mut rule = serde_json::Map::new();
        rule.insert(source_key.to_string(), json!(source));
        rule.insert("Description".to_string(), json!(description));
        if let Some(from) = port.from_port {
            rule.insert("FromPort".to_string(), json!(from));
        }
        rule.insert("IpProtocol".to_string(), json!(port.protocol.as_str()));
        if let Some(to) = port.to_port {
            rule.insert("ToPort".to_string(), json!(to));
        }
        let rule = Value::Object(rule);

        let Some(resource) = stack.resource_mut(&self.logical_id) else {
            return;
        };
        let exists = resource
            .property("SecurityGroupIngress")
            .and_then(Value::as_array)
            .is_some_and(|rules| rules.contains(&rule));
        if exists {
            tracing::debug!(security_group = %self.path, "Ingress rule already declared");
            return;
        }
        resource.push_property("SecurityGroupIngress", rule);
    }

    pub fn security_group_id(&self) -> Value {
        self.logical_id.get_att("GroupId")
    }
}

// ============ Key pair ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyType {
    #[default]
    Rsa,
    Ed25519,
}

impl KeyType {
    fn as_str(&self) -> &'static str {
        match self {
            KeyType::Rsa => "rsa",
            KeyType::Ed25519 => "ed25519",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyPairProps {
    pub name: String,
    pub description: Option<String>,
    pub key_type: KeyType,
    /// Import this public key instead of generating one
    pub public_key_material: Option<String>,
}

/// A declared key pair
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
    name: String,
}

impl KeyPair {
    pub fn new(stack: &mut Stack, id: &str, props: KeyPairProps) -> Self {
        let path = stack.path().child(id);

        let mut resource = CfnResource::new("AWS::EC2::KeyPair")
            .with_property("KeyName", props.name.as_str())
            .with_property("KeyType", props.key_type.as_str())
            .with_property("PublicKeyMaterial", props.public_key_material);
        if let Some(description) = &props.description {
            resource.set_tag("Description", description.as_str());
        }

        let logical_id = stack.add_resource(path.child("Resource"), resource);
        stack.register_construct(ConstructKind::KeyPair, path.clone());
        Self {
            logical_id,
            path,
            name: props.name,
        }
    }

    /// Declared key name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference resolving to the key name, ordering users after the key pair
    pub fn key_pair_name(&self) -> Value {
        self.logical_id.reference()
    }

    pub fn key_pair_id(&self) -> Value {
        self.logical_id.get_att("KeyPairId")
    }

    /// `arn:<partition>:ec2:<region>:<account>:key-pair/<id>`
    pub fn key_pair_arn(&self, stack: &Stack) -> Value {
        join(
            "",
            vec![
                json!("arn:"),
                stack.partition(),
                json!(":ec2:"),
                stack.region(),
                json!(":"),
                stack.account(),
                json!(":key-pair/"),
                self.key_pair_id(),
            ],
        )
    }

    /// Let `role` read this key pair, including its public key
    ///
    /// `ec2:DescribeKeyPairs` has no resource-level permissions, so the
    /// statement is granted on `*`.
    pub fn grant_read_on_public_key(&self, stack: &mut Stack, role: &mut Role) {
        let statement = PolicyStatement::allow(
            vec!["ec2:DescribeKeyPairs".to_string()],
            vec![json!("*")],
        );
        role.add_to_policy(stack, statement);
    }
}

// ============ Instance ============

/// Instance family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceClass {
    T2,
    T3,
    T3a,
    T4g,
    M5,
    M6i,
    C5,
    R5,
}

impl InstanceClass {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceClass::T2 => "t2",
            InstanceClass::T3 => "t3",
            InstanceClass::T3a => "t3a",
            InstanceClass::T4g => "t4g",
            InstanceClass::M5 => "m5",
            InstanceClass::M6i => "m6i",
            InstanceClass::C5 => "c5",
            InstanceClass::R5 => "r5",
        }
    }

    /// Baseline performance with burst credits
    pub fn is_burstable(&self) -> bool {
        matches!(
            self,
            InstanceClass::T2 | InstanceClass::T3 | InstanceClass::T3a | InstanceClass::T4g
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
    Xlarge,
    Xlarge2,
}

impl InstanceSize {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceSize::Nano => "nano",
            InstanceSize::Micro => "micro",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
            InstanceSize::Xlarge => "xlarge",
            InstanceSize::Xlarge2 => "2xlarge",
        }
    }
}

/// Size class such as `t2.micro`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceType(String);

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self(format!("{}.{}", class.as_str(), size.as_str()))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the instance's image id comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineImage {
    /// Resolved by image name through the lookup context
    Lookup { name: String, owners: Vec<String> },
    /// A fixed image id
    Id(String),
}

impl MachineImage {
    pub fn lookup(name: impl Into<String>) -> Self {
        MachineImage::Lookup {
            name: name.into(),
            owners: Vec::new(),
        }
    }

    pub fn from_image_id(id: impl Into<String>) -> Self {
        MachineImage::Id(id.into())
    }

    fn resolve(&self, stack: &mut Stack) -> Value {
        match self {
            MachineImage::Id(id) => json!(id),
            MachineImage::Lookup { name, owners } => {
                let mut props = lookup_env_props(stack);
                props.insert(
                    "filters".to_string(),
                    json!({
                        "image-type": ["machine"],
                        "name": [name],
                        "state": ["available"],
                    }),
                );
                if !owners.is_empty() {
                    props.insert("owners".to_string(), json!(owners));
                }
                stack.lookup(ContextLookup::new(LookupProvider::Ami, props))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceProps<'a> {
    pub vpc: &'a Vpc,
    pub vpc_subnets: SubnetSelection,
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    pub security_group: &'a SecurityGroup,
    /// Key name, literal or a reference such as [`KeyPair::key_pair_name`]
    pub key_name: Option<Value>,
    /// Execution role; one trusting EC2 is created when absent
    pub role: Option<&'a Role>,
    pub user_data: Option<String>,
}

/// A declared compute instance
#[derive(Debug, Clone)]
pub struct Instance {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
    role: LogicalId,
    instance_profile: LogicalId,
}

impl Instance {
    pub fn new(stack: &mut Stack, id: &str, props: InstanceProps<'_>) -> Self {
        let path = stack.path().child(id);

        let (role_id, role_policy) = match props.role {
            Some(role) => (role.logical_id.clone(), role.default_policy().cloned()),
            None => {
                let role = Role::declare(
                    stack,
                    path.child("InstanceRole"),
                    RoleProps::new(ServicePrincipal::new("ec2.amazonaws.com")),
                );
                (role.logical_id, None)
            }
        };

        let profile = CfnResource::new("AWS::IAM::InstanceProfile")
            .with_property("Roles", json!([role_id.reference()]));
        let instance_profile = stack.add_resource(path.child("InstanceProfile"), profile);

        let image_id = props.machine_image.resolve(stack);

        let mut resource = CfnResource::new("AWS::EC2::Instance")
            .with_property("IamInstanceProfile", instance_profile.reference())
            .with_property("ImageId", image_id)
            .with_property("InstanceType", props.instance_type.as_str())
            .with_property("KeyName", props.key_name)
            .with_property(
                "SecurityGroupIds",
                json!([props.security_group.security_group_id()]),
            )
            .with_property(
                "UserData",
                base64(json!(props.user_data.as_deref().unwrap_or(DEFAULT_USER_DATA))),
            )
            .with_dependency(&role_id);
        if let Some(policy) = &role_policy {
            resource.add_dependency(policy);
        }

        match props.vpc.select_subnets(&props.vpc_subnets).first() {
            Some(subnet) => {
                resource.set_property("AvailabilityZone", subnet.availability_zone());
                resource.set_property("SubnetId", subnet.subnet_id());
            }
            None => {
                tracing::warn!(instance = %path, "No subnet matches the selection");
            }
        }
        resource.set_tag("Name", path.to_string());

        let logical_id = stack.add_resource(path.child("Resource"), resource);
        stack.register_construct(ConstructKind::Instance, path.clone());
        tracing::debug!(instance = %path, instance_type = %props.instance_type, "Declared instance");

        Self {
            logical_id,
            path,
            role: role_id,
            instance_profile,
        }
    }

    pub fn instance_id(&self) -> Value {
        self.logical_id.reference()
    }

    /// Public IPv4 address, known once the instance is running
    pub fn instance_public_ip(&self) -> Value {
        self.logical_id.get_att("PublicIp")
    }

    pub fn role(&self) -> &LogicalId {
        &self.role
    }

    pub fn instance_profile(&self) -> &LogicalId {
        &self.instance_profile
    }
}
