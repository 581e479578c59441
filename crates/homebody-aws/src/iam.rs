//! IAM constructs: execution roles and their policies

use homebody_cloud::intrinsic::join;
use homebody_cloud::{CfnResource, ConstructKind, ConstructPath, LogicalId, Pseudo, Stack};
use serde_json::{Value, json};

const POLICY_VERSION: &str = "2012-10-17";

/// A service allowed to assume a role, e.g. `ec2.amazonaws.com`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipal(String);

impl ServicePrincipal {
    pub fn new(service: impl Into<String>) -> Self {
        Self(service.into())
    }

    pub fn service(&self) -> &str {
        &self.0
    }
}

/// A provider-managed policy referenced by name
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedPolicy {
    name: String,
}

impl ManagedPolicy {
    pub fn from_aws_managed_policy_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `arn:<partition>:iam::aws:policy/<name>`
    pub fn managed_policy_arn(&self) -> Value {
        join(
            "",
            vec![
                json!("arn:"),
                Pseudo::Partition.value(),
                json!(format!(":iam::aws:policy/{}", self.name)),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

/// One statement of an inline policy
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow(actions: Vec<String>, resources: Vec<Value>) -> Self {
        Self {
            effect: Effect::Allow,
            actions,
            resources,
        }
    }

    /// Single-element lists collapse to a scalar
    pub fn to_json(&self) -> Value {
        json!({
            "Action": collapse(self.actions.iter().map(|a| json!(a)).collect()),
            "Effect": match self.effect {
                Effect::Allow => "Allow",
                Effect::Deny => "Deny",
            },
            "Resource": collapse(self.resources.clone()),
        })
    }
}

fn collapse(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

#[derive(Debug, Clone)]
pub struct RoleProps {
    pub assumed_by: ServicePrincipal,
    pub managed_policies: Vec<ManagedPolicy>,
    pub description: Option<String>,
    pub role_name: Option<String>,
}

impl RoleProps {
    pub fn new(assumed_by: ServicePrincipal) -> Self {
        Self {
            assumed_by,
            managed_policies: Vec::new(),
            description: None,
            role_name: None,
        }
    }
}

/// A declared execution role
#[derive(Debug, Clone)]
pub struct Role {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
    default_policy: Option<LogicalId>,
}

impl Role {
    pub fn new(stack: &mut Stack, id: &str, props: RoleProps) -> Self {
        let path = stack.path().child(id);
        Self::declare(stack, path, props)
    }

    pub(crate) fn declare(stack: &mut Stack, path: ConstructPath, props: RoleProps) -> Self {
        let trust = json!({
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": props.assumed_by.service() }
            }],
            "Version": POLICY_VERSION
        });

        let mut resource = CfnResource::new("AWS::IAM::Role")
            .with_property("AssumeRolePolicyDocument", trust)
            .with_property("Description", props.description)
            .with_property("RoleName", props.role_name);
        if !props.managed_policies.is_empty() {
            let arns: Vec<Value> = props
                .managed_policies
                .iter()
                .map(ManagedPolicy::managed_policy_arn)
                .collect();
            resource.set_property("ManagedPolicyArns", arns);
        }

        let logical_id = stack.add_resource(path.child("Resource"), resource);
        stack.register_construct(ConstructKind::ExecutionRole, path.clone());
        Self {
            logical_id,
            path,
            default_policy: None,
        }
    }

    pub fn role_name(&self) -> Value {
        self.logical_id.reference()
    }

    /// Logical id of the inline policy, once a statement has been added
    pub fn default_policy(&self) -> Option<&LogicalId> {
        self.default_policy.as_ref()
    }

    /// Append a statement to the role's inline policy, creating it on first use
    pub fn add_to_policy(&mut self, stack: &mut Stack, statement: PolicyStatement) {
        let statement = statement.to_json();

        if let Some(policy_id) = &self.default_policy {
            let Some(policy) = stack.resource_mut(policy_id) else {
                return;
            };
            let statements = policy
                .properties
                .get_mut("PolicyDocument")
                .and_then(|doc| doc.get_mut("Statement"))
                .and_then(Value::as_array_mut);
            if let Some(statements) = statements {
                if !statements.contains(&statement) {
                    statements.push(statement);
                }
            }
            return;
        }

        let policy_path = self.path.child("DefaultPolicy").child("Resource");
        let policy_name = policy_path.logical_id();
        let policy = CfnResource::new("AWS::IAM::Policy")
            .with_property(
                "PolicyDocument",
                json!({ "Statement": [statement], "Version": POLICY_VERSION }),
            )
            .with_property("PolicyName", policy_name.as_str())
            .with_property("Roles", json!([self.role_name()]));
        let policy_id = stack.add_resource(policy_path, policy);
        tracing::debug!(role = %self.path, policy = %policy_id, "Created default policy");
        self.default_policy = Some(policy_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homebody_cloud::{Context, StackProps};

    fn ec2_role(stack: &mut Stack) -> Role {
        let mut props = RoleProps::new(ServicePrincipal::new("ec2.amazonaws.com"));
        props.managed_policies = vec![ManagedPolicy::from_aws_managed_policy_name(
            "AmazonSSMManagedInstanceCore",
        )];
        Role::new(stack, "ec2Role", props)
    }

    #[test]
    fn test_role_trust_and_managed_policy() {
        let mut stack = Stack::new("S", StackProps::default(), Context::new());
        let role = ec2_role(&mut stack);

        let resource = stack.resource(&role.logical_id).unwrap();
        assert_eq!(resource.resource_type, "AWS::IAM::Role");
        let trust = resource.property("AssumeRolePolicyDocument").unwrap();
        assert_eq!(
            trust["Statement"][0]["Principal"]["Service"],
            json!("ec2.amazonaws.com")
        );

        let arns: Vec<Value> = resource.get_property("ManagedPolicyArns").unwrap();
        assert_eq!(arns.len(), 1);
        assert_eq!(
            arns[0]["Fn::Join"][1][2],
            json!(":iam::aws:policy/AmazonSSMManagedInstanceCore")
        );
        assert!(resource.property("Description").is_none());
        assert_eq!(stack.constructs_of(ConstructKind::ExecutionRole).len(), 1);
    }

    #[test]
    fn test_add_to_policy_creates_then_appends() {
        let mut stack = Stack::new("S", StackProps::default(), Context::new());
        let mut role = ec2_role(&mut stack);
        assert!(role.default_policy().is_none());

        let read = PolicyStatement::allow(vec!["s3:GetObject".to_string()], vec![json!("*")]);
        role.add_to_policy(&mut stack, read.clone());
        role.add_to_policy(&mut stack, read);
        role.add_to_policy(
            &mut stack,
            PolicyStatement::allow(
                vec!["ec2:DescribeKeyPairs".to_string(), "ec2:DescribeImages".to_string()],
                vec![json!("*")],
            ),
        );

        let policy_id = role.default_policy().unwrap().clone();
        let policy = stack.resource(&policy_id).unwrap();
        assert_eq!(policy.resource_type, "AWS::IAM::Policy");
        assert_eq!(policy.property("PolicyName"), Some(&json!(policy_id.as_str())));
        assert_eq!(policy.property("Roles"), Some(&json!([role.role_name()])));

        let statements = policy.property("PolicyDocument").unwrap()["Statement"]
            .as_array()
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0]["Action"], json!("s3:GetObject"));
        assert!(statements[1]["Action"].is_array());
    }

    #[test]
    fn test_deny_statement() {
        let statement = PolicyStatement {
            effect: Effect::Deny,
            actions: vec!["dynamodb:DeleteTable".to_string()],
            resources: vec![json!("*"), json!("arn:aws:dynamodb:*:*:table/appliances")],
        };
        assert_eq!(
            statement.to_json(),
            json!({
                "Action": "dynamodb:DeleteTable",
                "Effect": "Deny",
                "Resource": ["*", "arn:aws:dynamodb:*:*:table/appliances"],
            })
        );
    }
}
