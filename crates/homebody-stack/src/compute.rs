//! Network and web server

use homebody_aws::{
    Instance, InstanceClass, InstanceProps, InstanceSize, InstanceType, Ipv4Cidr, KeyPair,
    KeyPairProps, MachineImage, ManagedPolicy, Peer, Port, Role, RoleProps, SecurityGroup,
    SecurityGroupProps, ServicePrincipal, SubnetSelection, SubnetType, Vpc, VpcProps,
};
use homebody_cloud::Stack;
use std::net::Ipv4Addr;

pub const NETWORK_ID: &str = "HomeBody";
pub const KEY_PAIR_ID: &str = "KeyPair";
pub const KEY_PAIR_NAME: &str = "homebody-keypair";
pub const SECURITY_GROUP_ID: &str = "WebDMZ";
pub const ROLE_ID: &str = "ec2Role";
pub const INSTANCE_ID: &str = "WebServer";
pub const IMAGE_NAME: &str = "Ubuntu Server 22.04 LTS";
pub const SSM_MANAGED_POLICY: &str = "AmazonSSMManagedInstanceCore";

/// `10.0.0.0/24`
pub fn network_cidr() -> Ipv4Cidr {
    Ipv4Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 24)
}

/// Everything declared by [`create_web_server`]
#[derive(Debug, Clone)]
pub struct WebServer {
    pub vpc: Vpc,
    pub key_pair: KeyPair,
    pub security_group: SecurityGroup,
    pub role: Role,
    pub instance: Instance,
}

/// Network, key pair, firewall, role and the instance using them
pub fn create_web_server(stack: &mut Stack) -> WebServer {
    let vpc = Vpc::new(
        stack,
        NETWORK_ID,
        VpcProps {
            ip_addresses: network_cidr(),
            ..Default::default()
        },
    );

    let key_pair = KeyPair::new(
        stack,
        KEY_PAIR_ID,
        KeyPairProps {
            name: KEY_PAIR_NAME.to_string(),
            description: Some("Key Pair created with CDK Deployment".to_string()),
            ..Default::default()
        },
    );

    let security_group = SecurityGroup::new(
        stack,
        SECURITY_GROUP_ID,
        SecurityGroupProps {
            vpc: &vpc,
            description: Some("Allow Http, Https, and SSH".to_string()),
            allow_all_outbound: true,
            security_group_name: None,
        },
    );
    for (port, description) in [
        (22, "Allow SSH Access"),
        (80, "Allow HTTP Access"),
        (443, "Allow HTTPS Access"),
    ] {
        security_group.add_ingress_rule(stack, Peer::any_ipv4(), Port::tcp(port), description);
    }

    let mut role_props = RoleProps::new(ServicePrincipal::new("ec2.amazonaws.com"));
    role_props.managed_policies = vec![ManagedPolicy::from_aws_managed_policy_name(
        SSM_MANAGED_POLICY,
    )];
    let mut role = Role::new(stack, ROLE_ID, role_props);

    // Before the instance, so the instance waits for the policy
    key_pair.grant_read_on_public_key(stack, &mut role);

    let instance = Instance::new(
        stack,
        INSTANCE_ID,
        InstanceProps {
            vpc: &vpc,
            vpc_subnets: SubnetSelection::of_type(SubnetType::Public),
            instance_type: InstanceType::of(InstanceClass::T2, InstanceSize::Micro),
            machine_image: MachineImage::lookup(IMAGE_NAME),
            security_group: &security_group,
            key_name: Some(key_pair.key_pair_name()),
            role: Some(&role),
            user_data: None,
        },
    );

    WebServer {
        vpc,
        key_pair,
        security_group,
        role,
        instance,
    }
}
