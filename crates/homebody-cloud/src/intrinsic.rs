//! Template intrinsic functions and pseudo parameters
//!
//! Values produced here are resolved by the provisioning engine, never by
//! this crate.

use serde_json::{Value, json};

/// Pseudo parameters available in every template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
}

impl Pseudo {
    pub fn name(&self) -> &'static str {
        match self {
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Region => "AWS::Region",
            Pseudo::Partition => "AWS::Partition",
        }
    }

    pub fn value(&self) -> Value {
        reference(self.name())
    }
}

pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

pub fn select(index: usize, list: Value) -> Value {
    json!({ "Fn::Select": [index, list] })
}

/// Availability zones of `region`; an empty string means the stack's own region.
pub fn get_azs(region: &str) -> Value {
    json!({ "Fn::GetAZs": region })
}

pub fn base64(value: Value) -> Value {
    json!({ "Fn::Base64": value })
}
