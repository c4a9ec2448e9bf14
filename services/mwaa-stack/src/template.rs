//! CloudFormation template assembly
//!
//! Resources are declared as JSON values the way CloudFormation expects
//! them. Nothing here talks to AWS; the rendered template is handed to the
//! provisioning engine as-is.

use heck::ToUpperCamelCase;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::StackResult;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Logical id for a construct id, e.g. `airflow-dag-bucket` -> `AirflowDagBucket`
pub fn logical_id(construct_id: &str) -> String {
    construct_id.to_upper_camel_case()
}

/// `{"Ref": id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// A CloudFormation template under construction
#[derive(Debug, Clone, Default)]
pub struct Template {
    description: String,
    tags: BTreeMap<String, String>,
    metadata: Map<String, Value>,
    parameters: Map<String, Value>,
    resources: Map<String, Value>,
    outputs: Map<String, Value>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Tag applied to every taggable resource
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Stack tags in the `[{"Key", "Value"}]` form most resources use
    pub fn tag_list(&self) -> Value {
        Value::Array(
            self.tags
                .iter()
                .map(|(key, value)| json!({ "Key": key, "Value": value }))
                .collect(),
        )
    }

    /// Stack tags in the plain map form (MWAA environments)
    pub fn tag_map(&self) -> Value {
        json!(self.tags)
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, parameter: Value) {
        self.parameters.insert(name.into(), parameter);
    }

    pub fn add_resource(&mut self, logical_id: impl Into<String>, resource: Value) {
        let logical_id = logical_id.into();
        debug!(
            logical_id = %logical_id,
            resource_type = resource["Type"].as_str().unwrap_or("unknown"),
            "Declaring resource"
        );
        if self.resources.insert(logical_id.clone(), resource).is_some() {
            warn!(logical_id = %logical_id, "Resource declared twice, keeping the latest");
        }
    }

    pub fn add_output(&mut self, name: impl Into<String>, value: Value, description: &str) {
        self.outputs.insert(
            name.into(),
            json!({ "Description": description, "Value": value }),
        );
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    /// Logical ids of all resources of a CloudFormation type
    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r["Type"] == resource_type)
            .map(|(id, _)| id.as_str())
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn to_value(&self) -> Value {
        let mut template = Map::new();
        template.insert("AWSTemplateFormatVersion".into(), json!(TEMPLATE_FORMAT_VERSION));
        template.insert("Description".into(), json!(self.description));
        if !self.metadata.is_empty() {
            template.insert("Metadata".into(), Value::Object(self.metadata.clone()));
        }
        if !self.parameters.is_empty() {
            template.insert("Parameters".into(), Value::Object(self.parameters.clone()));
        }
        template.insert("Resources".into(), Value::Object(self.resources.clone()));
        if !self.outputs.is_empty() {
            template.insert("Outputs".into(), Value::Object(self.outputs.clone()));
        }
        Value::Object(template)
    }

    pub fn to_json_pretty(&self) -> StackResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }
}
