use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Metadata key carrying the construct path of a resource
pub const PATH_METADATA_KEY: &str = "aws:cdk:path";

/// CFN template of a single stack
///
/// Resources and conditions keep declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    conditions: Map<String, Value>,

    #[serde(default)]
    resources: Map<String, Value>,
}

impl Template {
    pub fn new(description: Option<String>) -> Self {
        Template {
            description,
            ..Default::default()
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resources(&self) -> &Map<String, Value> {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    /// All resources of a CFN type, e.g. "AWS::KMS::Key"
    pub fn resources_of_type(&self, kind: &str) -> Vec<(&String, &Value)> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.get("Type").and_then(Value::as_str) == Some(kind))
            .collect()
    }

    pub fn conditions(&self) -> &Map<String, Value> {
        &self.conditions
    }

    /// Add a resource, logical ids must be unique within the template
    pub(crate) fn add_resource(
        &mut self,
        logical_id: &str,
        resource: CfnResource,
    ) -> eyre::Result<()> {
        if self.resources.contains_key(logical_id) {
            eyre::bail!("Duplicate logical id {logical_id:?} in template");
        }

        let value = serde_json::to_value(resource)
            .wrap_err_with(|| format!("Failed to serialize resource {logical_id}"))?;

        self.resources.insert(logical_id.to_string(), value);
        Ok(())
    }

    /// Add a condition once, repeated additions of the same name are ignored
    pub(crate) fn add_condition(&mut self, name: &str, condition: Value) {
        self.conditions.entry(name).or_insert(condition);
    }

    pub fn to_json(&self) -> eyre::Result<String> {
        serde_json::to_string_pretty(self).wrap_err("Failed to serialize template")
    }
}

/// Removal behavior of a resource when it leaves the stack
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Keep the physical resource, the default for stateful resources
    #[default]
    Retain,
    Destroy,
}

impl RemovalPolicy {
    fn as_cfn(&self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Destroy => "Delete",
        }
    }
}

/// A single entry of the Resources section
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CfnResource {
    #[serde(rename = "Type")]
    kind: &'static str,

    properties: Value,

    update_replace_policy: &'static str,
    deletion_policy: &'static str,
    metadata: Value,
}

impl CfnResource {
    pub(crate) fn new(
        kind: &'static str,
        properties: Value,
        removal_policy: RemovalPolicy,
        path: &str,
    ) -> Self {
        CfnResource {
            kind,
            properties,
            update_replace_policy: removal_policy.as_cfn(),
            deletion_policy: removal_policy.as_cfn(),
            metadata: json!({ PATH_METADATA_KEY: path }),
        }
    }
}

/// Intrinsic functions used in properties
pub mod intrinsic {
    use serde_json::{json, Value};

    pub fn reference(name: &str) -> Value {
        json!({ "Ref": name })
    }

    pub fn get_att(logical_id: &str, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [logical_id, attribute] })
    }

    pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
        json!({ "Fn::Join": [delimiter, parts] })
    }

    pub fn equals(left: Value, right: Value) -> Value {
        json!({ "Fn::Equals": [left, right] })
    }

    pub fn or(conditions: Vec<Value>) -> Value {
        json!({ "Fn::Or": conditions })
    }

    pub fn condition_if(condition: &str, when_true: Value, when_false: Value) -> Value {
        json!({ "Fn::If": [condition, when_true, when_false] })
    }

    pub fn no_value() -> Value {
        reference("AWS::NoValue")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> CfnResource {
        CfnResource::new(
            "AWS::SQS::Queue",
            json!({ "QueueName": "jobs" }),
            RemovalPolicy::Destroy,
            "Stack/Queue/Resource",
        )
    }

    #[test]
    fn test_should_render_resource_entry() {
        let mut template = Template::new(None);
        template.add_resource("Queue", queue()).unwrap();

        assert_eq!(
            template.resource("Queue").unwrap(),
            &json!({
                "Type": "AWS::SQS::Queue",
                "Properties": { "QueueName": "jobs" },
                "UpdateReplacePolicy": "Delete",
                "DeletionPolicy": "Delete",
                "Metadata": { "aws:cdk:path": "Stack/Queue/Resource" }
            })
        );
    }

    #[test]
    fn test_should_reject_duplicate_logical_id() {
        let mut template = Template::new(None);
        template.add_resource("Queue", queue()).unwrap();
        assert!(template.add_resource("Queue", queue()).is_err());
    }

    #[test]
    fn test_should_skip_empty_sections() {
        let template = Template::new(None);
        let value = serde_json::to_value(&template).unwrap();

        assert_eq!(value, json!({ "Resources": {} }));
    }

    #[test]
    fn test_should_keep_first_condition() {
        let mut template = Template::new(Some("Streams".into()));
        template.add_condition("IsChina", json!(true));
        template.add_condition("IsChina", json!(false));

        assert_eq!(template.conditions().get("IsChina"), Some(&json!(true)));
        assert_eq!(template.description(), Some("Streams"));
    }

    #[test]
    fn test_should_keep_declaration_order() {
        let mut template = Template::new(None);

        for id in ["Zeta", "Alpha", "Mid"] {
            template.add_resource(id, queue()).unwrap();
        }

        let ids: Vec<&String> = template.resources().keys().collect();
        assert_eq!(ids, ["Zeta", "Alpha", "Mid"]);
    }
}
