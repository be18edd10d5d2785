use crate::construct::Node;
use crate::logical_id;
use crate::template::{intrinsic, CfnResource, RemovalPolicy, Template};
use serde_json::{json, Map, Value};

pub const KEY_TYPE: &str = "AWS::KMS::Key";

const MIN_PENDING_WINDOW_DAYS: u32 = 7;
const MAX_PENDING_WINDOW_DAYS: u32 = 30;

#[derive(Clone, Debug, Default)]
pub struct KeyProps {
    /// Rotate the key material yearly
    pub enable_key_rotation: bool,

    pub description: Option<String>,

    /// Days before a deleted key is removed (7 to 30)
    pub pending_window_days: Option<u32>,

    pub removal_policy: RemovalPolicy,
}

/// Customer managed KMS key
#[derive(Clone, Debug)]
pub struct Key {
    node: Node,
    resource: Node,
    logical_id: String,
    props: KeyProps,
}

/// Handle to a declared key
///
/// Only obtainable by declaring a key, so a key always exists before it is referenced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRef {
    path: String,
    logical_id: String,
}

impl KeyRef {
    /// Construct path of the key
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Fn::GetAtt of the key ARN
    pub(crate) fn arn(&self) -> Value {
        intrinsic::get_att(&self.logical_id, "Arn")
    }
}

impl Key {
    pub(crate) fn new(node: Node, props: KeyProps) -> eyre::Result<Self> {
        if let Some(days) = props.pending_window_days {
            if !(MIN_PENDING_WINDOW_DAYS..=MAX_PENDING_WINDOW_DAYS).contains(&days) {
                eyre::bail!(
                    "Pending window must be between {MIN_PENDING_WINDOW_DAYS} and {MAX_PENDING_WINDOW_DAYS} days, got {days}"
                );
            }
        }

        let resource = node.child("Resource")?;
        let logical_id = logical_id::from_node(&resource)?;

        Ok(Key {
            node,
            resource,
            logical_id,
            props,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn props(&self) -> &KeyProps {
        &self.props
    }

    pub fn enable_key_rotation(&self) -> bool {
        self.props.enable_key_rotation
    }

    pub fn reference(&self) -> KeyRef {
        KeyRef {
            path: self.node.path().to_string(),
            logical_id: self.logical_id.clone(),
        }
    }

    pub(crate) fn synthesize(&self, template: &mut Template) -> eyre::Result<()> {
        let mut properties = Map::new();
        properties.insert("KeyPolicy".into(), Self::default_policy());

        if self.props.enable_key_rotation {
            properties.insert("EnableKeyRotation".into(), Value::Bool(true));
        }

        if let Some(description) = &self.props.description {
            properties.insert("Description".into(), Value::String(description.clone()));
        }

        if let Some(days) = self.props.pending_window_days {
            properties.insert("PendingWindowInDays".into(), json!(days));
        }

        template.add_resource(
            &self.logical_id,
            CfnResource::new(
                KEY_TYPE,
                Value::Object(properties),
                self.props.removal_policy,
                self.resource.path(),
            ),
        )
    }

    /// The account root gets full access, IAM policies decide the rest
    fn default_policy() -> Value {
        let root = intrinsic::join(
            "",
            vec![
                json!("arn:"),
                intrinsic::reference("AWS::Partition"),
                json!(":iam::"),
                intrinsic::reference("AWS::AccountId"),
                json!(":root"),
            ],
        );

        json!({
            "Statement": [{
                "Action": "kms:*",
                "Effect": "Allow",
                "Principal": { "AWS": root },
                "Resource": "*"
            }],
            "Version": "2012-10-17"
        })
    }
}
