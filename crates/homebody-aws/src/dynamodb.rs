//! DynamoDB table construct

use homebody_cloud::{CfnResource, ConstructKind, ConstructPath, LogicalId, RemovalPolicy, Stack};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

impl AttributeType {
    fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "S",
            AttributeType::Number => "N",
            AttributeType::Binary => "B",
        }
    }
}

/// A key attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    /// Fixed read/write capacity units
    Provisioned { read: u32, write: u32 },
    PayPerRequest,
}

impl Default for BillingMode {
    fn default() -> Self {
        BillingMode::Provisioned { read: 5, write: 5 }
    }
}

#[derive(Debug, Clone)]
pub struct TableProps {
    pub table_name: Option<String>,
    pub partition_key: Attribute,
    pub sort_key: Option<Attribute>,
    pub billing_mode: BillingMode,
    /// Retained by default so data outlives the stack
    pub removal_policy: RemovalPolicy,
}

impl TableProps {
    pub fn new(partition_key: Attribute) -> Self {
        Self {
            table_name: None,
            partition_key,
            sort_key: None,
            billing_mode: BillingMode::default(),
            removal_policy: RemovalPolicy::Retain,
        }
    }
}

/// A declared key-value table
#[derive(Debug, Clone)]
pub struct Table {
    pub logical_id: LogicalId,
    pub path: ConstructPath,
}

impl Table {
    pub fn new(stack: &mut Stack, id: &str, props: TableProps) -> Self {
        let path = stack.path().child(id);

        let mut key_schema = vec![json!({
            "AttributeName": props.partition_key.name,
            "KeyType": "HASH"
        })];
        let mut attributes = vec![json!({
            "AttributeName": props.partition_key.name,
            "AttributeType": props.partition_key.attribute_type.as_str()
        })];
        if let Some(sort_key) = &props.sort_key {
            key_schema.push(json!({ "AttributeName": sort_key.name, "KeyType": "RANGE" }));
            attributes.push(json!({
                "AttributeName": sort_key.name,
                "AttributeType": sort_key.attribute_type.as_str()
            }));
        }

        let mut resource = CfnResource::new("AWS::DynamoDB::Table")
            .with_property("AttributeDefinitions", attributes)
            .with_property("KeySchema", key_schema)
            .with_property("TableName", props.table_name)
            .with_removal_policy(props.removal_policy);
        match props.billing_mode {
            BillingMode::Provisioned { read, write } => resource.set_property(
                "ProvisionedThroughput",
                json!({ "ReadCapacityUnits": read, "WriteCapacityUnits": write }),
            ),
            BillingMode::PayPerRequest => resource.set_property("BillingMode", "PAY_PER_REQUEST"),
        }

        let logical_id = stack.add_resource(path.child("Resource"), resource);
        stack.register_construct(ConstructKind::Table, path.clone());
        Self { logical_id, path }
    }

    pub fn table_name(&self) -> Value {
        self.logical_id.reference()
    }
}
