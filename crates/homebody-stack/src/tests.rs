use super::*;
use crate::compute::{IMAGE_NAME, KEY_PAIR_NAME};
use crate::dns::DOMAIN_NAME;
use homebody_cloud::{CfnResource, ConstructKind, Environment, LookupProvider};
use serde_json::{Value, json};

fn build() -> InfraStack {
    InfraStack::build("InfraStack", StackProps::default(), &Context::new())
}

fn build_in(account: &str, region: &str, context: &Context) -> InfraStack {
    let props = StackProps {
        env: Environment::new(account, region),
        ..Default::default()
    };
    InfraStack::build("InfraStack", props, context)
}

fn only<'a>(template: &'a Template, resource_type: &str) -> &'a CfnResource {
    let resources = template.resources_of_type(resource_type);
    assert_eq!(resources.len(), 1, "expected one {}", resource_type);
    resources[0].1
}

#[test]
fn test_one_of_each_entity() {
    let infra = build();
    let stack = infra.stack();

    for kind in [
        ConstructKind::Network,
        ConstructKind::KeyPair,
        ConstructKind::FirewallRuleSet,
        ConstructKind::ExecutionRole,
        ConstructKind::Instance,
        ConstructKind::Table,
        ConstructKind::HostedZoneLookup,
        ConstructKind::DnsRecord,
    ] {
        assert_eq!(stack.constructs_of(kind).len(), 1, "{}", kind);
    }

    let template = infra.synthesize().unwrap();
    only(&template, "AWS::EC2::KeyPair");
    only(&template, "AWS::EC2::SecurityGroup");
    only(&template, "AWS::IAM::Role");
    only(&template, "AWS::EC2::Instance");
    only(&template, "AWS::DynamoDB::Table");
    only(&template, "AWS::Route53::RecordSet");
}

#[test]
fn test_single_network_with_cidr() {
    let template = build().synthesize().unwrap();
    let vpc = only(&template, "AWS::EC2::VPC");
    assert_eq!(vpc.property("CidrBlock"), Some(&json!("10.0.0.0/24")));

    let mut subnets: Vec<String> = template
        .resources_of_type("AWS::EC2::Subnet")
        .iter()
        .filter_map(|(_, s)| s.get_property::<String>("CidrBlock"))
        .collect();
    subnets.sort();
    assert_eq!(
        subnets,
        vec!["10.0.0.0/26", "10.0.0.128/26", "10.0.0.192/26", "10.0.0.64/26"]
    );
}

#[test]
fn test_firewall_rules() {
    let template = build().synthesize().unwrap();
    let sg = only(&template, "AWS::EC2::SecurityGroup");
    assert_eq!(
        sg.property("GroupDescription"),
        Some(&json!("Allow Http, Https, and SSH"))
    );

    let ingress: Vec<Value> = sg.get_property("SecurityGroupIngress").unwrap();
    assert_eq!(ingress.len(), 3);
    let mut ports: Vec<u64> = ingress
        .iter()
        .map(|rule| {
            assert_eq!(rule["CidrIp"], json!("0.0.0.0/0"));
            assert_eq!(rule["IpProtocol"], json!("tcp"));
            assert_eq!(rule["FromPort"], rule["ToPort"]);
            rule["FromPort"].as_u64().unwrap()
        })
        .collect();
    ports.sort();
    assert_eq!(ports, vec![22, 80, 443]);
    assert_eq!(ingress[0]["Description"], json!("Allow SSH Access"));

    let egress: Vec<Value> = sg.get_property("SecurityGroupEgress").unwrap();
    assert_eq!(egress.len(), 1);
    assert_eq!(egress[0]["CidrIp"], json!("0.0.0.0/0"));
    assert_eq!(egress[0]["IpProtocol"], json!("-1"));
}

#[test]
fn test_instance_uses_key_pair_name() {
    let infra = build();
    let template = infra.synthesize().unwrap();

    let key_pair = only(&template, "AWS::EC2::KeyPair");
    assert_eq!(key_pair.property("KeyName"), Some(&json!(KEY_PAIR_NAME)));
    assert_eq!(
        key_pair.tag("Description"),
        Some(&json!("Key Pair created with CDK Deployment"))
    );

    let instance = only(&template, "AWS::EC2::Instance");
    assert_eq!(
        instance.property("KeyName"),
        Some(&infra.web_server.key_pair.key_pair_name())
    );
    assert_eq!(infra.web_server.key_pair.name(), KEY_PAIR_NAME);
}

#[test]
fn test_role_trust_and_policies() {
    let infra = build();
    let template = infra.synthesize().unwrap();
    let role = only(&template, "AWS::IAM::Role");

    let trust = role.property("AssumeRolePolicyDocument").unwrap();
    let statements = trust["Statement"].as_array().unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0]["Principal"]["Service"], json!("ec2.amazonaws.com"));

    let arns: Vec<Value> = role.get_property("ManagedPolicyArns").unwrap();
    assert_eq!(arns.len(), 1);
    assert!(
        arns[0]["Fn::Join"][1][2]
            .as_str()
            .unwrap()
            .ends_with("AmazonSSMManagedInstanceCore")
    );
}

#[test]
fn test_key_pair_grant_goes_to_default_policy() {
    let infra = build();
    let template = infra.synthesize().unwrap();
    let policy = only(&template, "AWS::IAM::Policy");

    let statement = &policy.property("PolicyDocument").unwrap()["Statement"][0];
    assert_eq!(statement["Action"], json!("ec2:DescribeKeyPairs"));
    assert_eq!(statement["Effect"], json!("Allow"));
    assert_eq!(statement["Resource"], json!("*"));
    assert_eq!(
        policy.property("Roles"),
        Some(&json!([infra.web_server.role.role_name()]))
    );

    // The instance waits for both the role and its policy
    let instance = only(&template, "AWS::EC2::Instance");
    let policy_id = infra.web_server.role.default_policy().unwrap();
    assert!(instance.depends_on.contains(policy_id));
    assert!(instance.depends_on.contains(&infra.web_server.role.logical_id));
}

#[test]
fn test_instance_placement_and_size() {
    let infra = build();
    let template = infra.synthesize().unwrap();
    let instance = only(&template, "AWS::EC2::Instance");

    assert_eq!(instance.property("InstanceType"), Some(&json!("t2.micro")));
    let first_public = infra.web_server.vpc.public_subnets()[0];
    assert_eq!(instance.property("SubnetId"), Some(&first_public.subnet_id()));
    assert_eq!(
        instance.property("SecurityGroupIds"),
        Some(&json!([infra.web_server.security_group.security_group_id()]))
    );

    // The profile wraps the declared role rather than a generated one
    let profile = only(&template, "AWS::IAM::InstanceProfile");
    assert_eq!(
        profile.property("Roles"),
        Some(&json!([infra.web_server.role.role_name()]))
    );
}

#[test]
fn test_table_key() {
    let template = build().synthesize().unwrap();
    let table = only(&template, "AWS::DynamoDB::Table");

    assert_eq!(table.property("TableName"), Some(&json!("appliances")));
    assert_eq!(
        table.property("KeySchema"),
        Some(&json!([{ "AttributeName": "Id", "KeyType": "HASH" }]))
    );
    assert_eq!(
        table.property("AttributeDefinitions"),
        Some(&json!([{ "AttributeName": "Id", "AttributeType": "S" }]))
    );
    assert!(table.property("GlobalSecondaryIndexes").is_none());
}

#[test]
fn test_dns_record_targets_instance_ip() {
    let infra = build();
    let template = infra.synthesize().unwrap();
    let record = only(&template, "AWS::Route53::RecordSet");

    assert_eq!(record.property("Type"), Some(&json!("A")));
    assert_eq!(record.property("Name"), Some(&json!("ask-frank.shop.")));
    assert_eq!(
        record.property("ResourceRecords"),
        Some(&json!([infra.web_server.instance.instance_public_ip()]))
    );
    assert_eq!(infra.zone.zone_name(), DOMAIN_NAME);
}

#[test]
fn test_lookups_are_reported_missing() {
    let infra = build_in("123456789012", "ap-northeast-1", &Context::new());
    let missing = infra.stack().missing_context();
    assert_eq!(missing.len(), 2);

    let ami = missing
        .iter()
        .find(|m| m.provider == LookupProvider::Ami)
        .unwrap();
    assert_eq!(
        ami.key,
        format!(
            "ami:account=123456789012:filters.image-type.0=machine:filters.name.0={}:filters.state.0=available:region=ap-northeast-1",
            IMAGE_NAME
        )
    );

    let template = infra.synthesize().unwrap();
    let instance = only(&template, "AWS::EC2::Instance");
    assert_eq!(instance.property("ImageId"), Some(&json!("ami-1234")));
    let record = only(&template, "AWS::Route53::RecordSet");
    assert_eq!(record.property("HostedZoneId"), Some(&json!("DUMMY")));
}

#[test]
fn test_lookups_resolved_from_context() {
    let unresolved = build_in("123456789012", "ap-northeast-1", &Context::new());
    let mut context = Context::new();
    for missing in unresolved.stack().missing_context() {
        let value = match missing.provider {
            LookupProvider::Ami => json!("ami-0f36dcfcc94112ea1"),
            LookupProvider::HostedZone => {
                json!({ "Id": "/hostedzone/Z05524321ABCDEF", "Name": "ask-frank.shop." })
            }
        };
        context.set(missing.key.clone(), value);
    }

    let infra = build_in("123456789012", "ap-northeast-1", &context);
    assert!(infra.stack().missing_context().is_empty());

    let template = infra.synthesize().unwrap();
    let instance = only(&template, "AWS::EC2::Instance");
    assert_eq!(
        instance.property("ImageId"),
        Some(&json!("ami-0f36dcfcc94112ea1"))
    );
    let record = only(&template, "AWS::Route53::RecordSet");
    assert_eq!(record.property("HostedZoneId"), Some(&json!("Z05524321ABCDEF")));
}

#[test]
fn test_build_is_deterministic() {
    let first = build().synthesize().unwrap().to_json_pretty().unwrap();
    let second = build().synthesize().unwrap().to_json_pretty().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_stack_options_flow_into_template() {
    let mut props = StackProps {
        description: Some("HomeBody web server".to_string()),
        ..Default::default()
    };
    props.tags.insert("project".to_string(), "homebody".to_string());
    let infra = InfraStack::build("InfraStack", props, &Context::new());
    let template = infra.synthesize().unwrap();

    assert_eq!(template.description.as_deref(), Some("HomeBody web server"));
    let table = only(&template, "AWS::DynamoDB::Table");
    assert_eq!(table.tag("project"), Some(&json!("homebody")));
    let record = only(&template, "AWS::Route53::RecordSet");
    assert!(record.tag("project").is_none());
}
