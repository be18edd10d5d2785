use crate::construct::Node;
use crate::kms::{Key, KeyProps, KeyRef};
use crate::logical_id;
use crate::template::{intrinsic, CfnResource, RemovalPolicy, Template};
use eyre::WrapErr;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

pub const STREAM_TYPE: &str = "AWS::Kinesis::Stream";

/// Condition added when the region is unknown at synth time
pub const UNSUPPORTED_REGIONS_CONDITION: &str = "AwsCdkKinesisEncryptedStreamsUnsupportedRegions";

/// Regions without support for encrypted streams
const UNSUPPORTED_REGIONS: [&str; 2] = ["cn-north-1", "cn-northwest-1"];

/// AWS managed key of the Kinesis service
pub const MANAGED_KEY_ALIAS: &str = "alias/aws/kinesis";

const DEFAULT_RETENTION_HOURS: u32 = 24;
const MAX_RETENTION_HOURS: u32 = 8760;
const DEFAULT_SHARD_COUNT: u32 = 1;

static STREAM_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]{1,128}$").expect("Valid stream name regex"));

/// Requested encryption of the stream data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEncryption {
    Unencrypted,

    /// Encrypted with the AWS managed key
    Managed,

    /// Encrypted with a customer managed key
    Kms,
}

/// Capacity mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    Provisioned,
    OnDemand,
}

impl StreamMode {
    fn as_cfn(&self) -> &'static str {
        match self {
            StreamMode::Provisioned => "PROVISIONED",
            StreamMode::OnDemand => "ON_DEMAND",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StreamProps {
    /// Physical name, generated by CFN when not set
    pub stream_name: Option<String>,

    pub encryption: Option<StreamEncryption>,

    /// Key for customer managed encryption, must be declared in the same stack
    pub encryption_key: Option<KeyRef>,

    pub shard_count: Option<u32>,
    pub stream_mode: Option<StreamMode>,

    /// Hours the records stay in the stream (24 to 8760)
    pub retention_period_hours: Option<u32>,

    pub removal_policy: RemovalPolicy,
}

/// Encryption settled at declaration time
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedEncryption {
    Unencrypted,
    Managed,
    Kms(KeyRef),

    /// Managed unless deployed into a region without encrypted streams
    RegionDependent,
}

impl ResolvedEncryption {
    /// Encryption mode in the terms of the props
    pub fn mode(&self) -> Option<StreamEncryption> {
        match self {
            ResolvedEncryption::Unencrypted => Some(StreamEncryption::Unencrypted),
            ResolvedEncryption::Managed => Some(StreamEncryption::Managed),
            ResolvedEncryption::Kms(_) => Some(StreamEncryption::Kms),
            ResolvedEncryption::RegionDependent => None,
        }
    }
}

/// Kinesis data stream
#[derive(Clone, Debug)]
pub struct Stream {
    node: Node,
    resource: Node,
    logical_id: String,
    stream_name: Option<String>,
    encryption: ResolvedEncryption,

    /// Key created by the stream itself for KMS encryption without an explicit key
    own_key: Option<Key>,

    shard_count: Option<u32>,
    stream_mode: Option<StreamMode>,
    retention_period_hours: u32,
    removal_policy: RemovalPolicy,
}

impl Stream {
    /// The region of the stack decides the default encryption
    pub(crate) fn new(node: Node, props: StreamProps, region: Option<&str>) -> eyre::Result<Self> {
        if let Some(name) = &props.stream_name {
            if !STREAM_NAME_REGEX.is_match(name) {
                eyre::bail!(
                    "Stream name {name:?} must be 1 to 128 characters of letters, digits, '_', '.' and '-'"
                );
            }
        }

        let retention_period_hours = props
            .retention_period_hours
            .unwrap_or(DEFAULT_RETENTION_HOURS);

        if !(DEFAULT_RETENTION_HOURS..=MAX_RETENTION_HOURS).contains(&retention_period_hours) {
            eyre::bail!(
                "Retention period must be between {DEFAULT_RETENTION_HOURS} and {MAX_RETENTION_HOURS} hours, got {retention_period_hours}"
            );
        }

        let shard_count = match (props.stream_mode, props.shard_count) {
            (Some(StreamMode::OnDemand), Some(_)) => {
                eyre::bail!("Shard count can't be set for an on-demand stream")
            }
            (Some(StreamMode::OnDemand), None) => None,
            (_, Some(0)) => eyre::bail!("Shard count must be at least 1"),
            (_, count) => Some(count.unwrap_or(DEFAULT_SHARD_COUNT)),
        };

        let (encryption, own_key) =
            Self::resolve_encryption(&node, props.encryption, props.encryption_key, region)?;

        let resource = node.child("Resource")?;
        let logical_id = logical_id::from_node(&resource)?;

        Ok(Stream {
            node,
            resource,
            logical_id,
            stream_name: props.stream_name,
            encryption,
            own_key,
            shard_count,
            stream_mode: props.stream_mode,
            retention_period_hours,
            removal_policy: props.removal_policy,
        })
    }

    fn resolve_encryption(
        node: &Node,
        encryption: Option<StreamEncryption>,
        key: Option<KeyRef>,
        region: Option<&str>,
    ) -> eyre::Result<(ResolvedEncryption, Option<Key>)> {
        let resolved = match (encryption, key) {
            (None | Some(StreamEncryption::Kms), Some(key)) => ResolvedEncryption::Kms(key),

            (Some(encryption), Some(_)) => eyre::bail!(
                "Encryption key is set, so encryption must be {:?}, not {encryption:?}",
                StreamEncryption::Kms
            ),

            (Some(StreamEncryption::Kms), None) => {
                let key = Key::new(
                    node.child("Key")?,
                    KeyProps {
                        description: Some(format!("Created by {}", node.path())),
                        ..Default::default()
                    },
                )
                .wrap_err("Failed to create the stream key")?;

                return Ok((ResolvedEncryption::Kms(key.reference()), Some(key)));
            }

            (Some(StreamEncryption::Managed), None) => ResolvedEncryption::Managed,
            (Some(StreamEncryption::Unencrypted), None) => ResolvedEncryption::Unencrypted,

            (None, None) => match region {
                Some(region) if UNSUPPORTED_REGIONS.contains(&region) => {
                    ResolvedEncryption::Unencrypted
                }
                Some(_) => ResolvedEncryption::Managed,
                None => ResolvedEncryption::RegionDependent,
            },
        };

        Ok((resolved, None))
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.as_deref()
    }

    pub fn encryption(&self) -> &ResolvedEncryption {
        &self.encryption
    }

    /// Key used for customer managed encryption
    pub fn encryption_key(&self) -> Option<&KeyRef> {
        match &self.encryption {
            ResolvedEncryption::Kms(key) => Some(key),
            _ => None,
        }
    }

    pub fn own_key(&self) -> Option<&Key> {
        self.own_key.as_ref()
    }

    pub fn shard_count(&self) -> Option<u32> {
        self.shard_count
    }

    pub fn retention_period_hours(&self) -> u32 {
        self.retention_period_hours
    }

    pub(crate) fn synthesize(&self, template: &mut Template) -> eyre::Result<()> {
        if let Some(key) = &self.own_key {
            key.synthesize(template)?;
        }

        let mut properties = Map::new();

        if let Some(name) = &self.stream_name {
            properties.insert("Name".into(), Value::String(name.clone()));
        }

        properties.insert(
            "RetentionPeriodHours".into(),
            json!(self.retention_period_hours),
        );

        if let Some(count) = self.shard_count {
            properties.insert("ShardCount".into(), json!(count));
        }

        if let Some(mode) = self.stream_mode {
            properties.insert(
                "StreamModeDetails".into(),
                json!({ "StreamMode": mode.as_cfn() }),
            );
        }

        let managed = json!({ "EncryptionType": "KMS", "KeyId": MANAGED_KEY_ALIAS });

        match &self.encryption {
            ResolvedEncryption::Unencrypted => {}

            ResolvedEncryption::Managed => {
                properties.insert("StreamEncryption".into(), managed);
            }

            ResolvedEncryption::Kms(key) => {
                properties.insert(
                    "StreamEncryption".into(),
                    json!({ "EncryptionType": "KMS", "KeyId": key.arn() }),
                );
            }

            ResolvedEncryption::RegionDependent => {
                template.add_condition(UNSUPPORTED_REGIONS_CONDITION, unsupported_regions());

                properties.insert(
                    "StreamEncryption".into(),
                    intrinsic::condition_if(
                        UNSUPPORTED_REGIONS_CONDITION,
                        intrinsic::no_value(),
                        managed,
                    ),
                );
            }
        }

        template.add_resource(
            &self.logical_id,
            CfnResource::new(
                STREAM_TYPE,
                Value::Object(properties),
                self.removal_policy,
                self.resource.path(),
            ),
        )
    }
}

/// True when deployed into a region without encrypted streams
fn unsupported_regions() -> Value {
    intrinsic::or(
        UNSUPPORTED_REGIONS
            .iter()
            .map(|region| intrinsic::equals(intrinsic::reference("AWS::Region"), json!(region)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> Node {
        Node::root("Stack").unwrap()
    }

    fn key() -> KeyRef {
        Key::new(stack().child("Key").unwrap(), KeyProps::default())
            .unwrap()
            .reference()
    }

    fn stream(props: StreamProps, region: Option<&str>) -> eyre::Result<Stream> {
        Stream::new(stack().child("Stream")?, props, region)
    }

    fn render(stream: &Stream) -> Template {
        let mut template = Template::new(None);
        stream.synthesize(&mut template).unwrap();
        template
    }

    #[test]
    fn test_should_encrypt_with_given_key() {
        let props = StreamProps {
            stream_name: Some("events".into()),
            encryption: Some(StreamEncryption::Kms),
            encryption_key: Some(key()),
            ..Default::default()
        };

        let stream = stream(props, None).unwrap();
        assert_eq!(stream.encryption_key(), Some(&key()));
        assert!(stream.own_key().is_none());

        let template = render(&stream);
        let properties = &template.resource(stream.logical_id()).unwrap()["Properties"];

        assert_eq!(properties["Name"], "events");
        assert_eq!(properties["StreamEncryption"]["EncryptionType"], "KMS");
        assert_eq!(
            properties["StreamEncryption"]["KeyId"],
            json!({ "Fn::GetAtt": [key().logical_id(), "Arn"] })
        );
    }

    #[test]
    fn test_should_imply_kms_from_key() {
        let props = StreamProps {
            encryption_key: Some(key()),
            ..Default::default()
        };

        let stream = stream(props, None).unwrap();
        assert_eq!(stream.encryption().mode(), Some(StreamEncryption::Kms));
    }

    #[test]
    fn test_should_reject_key_with_other_encryption() {
        for encryption in [StreamEncryption::Managed, StreamEncryption::Unencrypted] {
            let props = StreamProps {
                encryption: Some(encryption),
                encryption_key: Some(key()),
                ..Default::default()
            };

            assert!(stream(props, None).is_err());
        }
    }

    #[test]
    fn test_should_create_own_key_for_kms_without_key() {
        let props = StreamProps {
            encryption: Some(StreamEncryption::Kms),
            ..Default::default()
        };

        let stream = stream(props, None).unwrap();
        let own_key = stream.own_key().unwrap();

        assert_eq!(own_key.node().path(), "Stack/Stream/Key");
        assert_eq!(stream.encryption_key(), Some(&own_key.reference()));
        assert_eq!(
            own_key.props().description.as_deref(),
            Some("Created by Stack/Stream")
        );

        let template = render(&stream);
        assert_eq!(template.resources_of_type("AWS::KMS::Key").len(), 1);
        assert_eq!(template.resources_of_type(STREAM_TYPE).len(), 1);
    }

    #[test]
    fn test_should_use_managed_key() {
        let props = StreamProps {
            encryption: Some(StreamEncryption::Managed),
            ..Default::default()
        };

        let stream = stream(props, None).unwrap();
        let template = render(&stream);
        let properties = &template.resource(stream.logical_id()).unwrap()["Properties"];

        assert_eq!(properties["StreamEncryption"]["KeyId"], MANAGED_KEY_ALIAS);
    }

    #[test]
    fn test_should_skip_encryption_when_unencrypted() {
        let props = StreamProps {
            encryption: Some(StreamEncryption::Unencrypted),
            ..Default::default()
        };

        let stream = stream(props, None).unwrap();
        let template = render(&stream);
        let properties = &template.resource(stream.logical_id()).unwrap()["Properties"];

        assert!(properties.get("StreamEncryption").is_none());
    }

    #[test]
    fn test_should_default_encryption_by_region() {
        let managed = stream(StreamProps::default(), Some("us-east-1")).unwrap();
        assert_eq!(managed.encryption(), &ResolvedEncryption::Managed);

        let china = stream(StreamProps::default(), Some("cn-north-1")).unwrap();
        assert_eq!(china.encryption(), &ResolvedEncryption::Unencrypted);

        let unknown = stream(StreamProps::default(), None).unwrap();
        assert_eq!(unknown.encryption(), &ResolvedEncryption::RegionDependent);
        assert_eq!(unknown.encryption().mode(), None);
    }

    #[test]
    fn test_should_add_condition_for_unknown_region() {
        let stream = stream(StreamProps::default(), None).unwrap();
        let template = render(&stream);

        let condition = &template.conditions()[UNSUPPORTED_REGIONS_CONDITION];
        assert_eq!(condition["Fn::Or"].as_array().unwrap().len(), 2);

        let encryption =
            &template.resource(stream.logical_id()).unwrap()["Properties"]["StreamEncryption"];
        assert_eq!(encryption["Fn::If"][0], UNSUPPORTED_REGIONS_CONDITION);
        assert_eq!(encryption["Fn::If"][1], json!({ "Ref": "AWS::NoValue" }));
    }

    #[test]
    fn test_should_default_capacity() {
        let stream = stream(StreamProps::default(), None).unwrap();
        assert_eq!(stream.shard_count(), Some(1));
        assert_eq!(stream.retention_period_hours(), 24);

        let template = render(&stream);
        let properties = &template.resource(stream.logical_id()).unwrap()["Properties"];
        assert!(properties.get("StreamModeDetails").is_none());
        assert!(properties.get("Name").is_none());
    }

    #[test]
    fn test_should_render_on_demand_mode() {
        let props = StreamProps {
            stream_mode: Some(StreamMode::OnDemand),
            ..Default::default()
        };

        let stream = stream(props, None).unwrap();
        assert_eq!(stream.shard_count(), None);

        let template = render(&stream);
        let properties = &template.resource(stream.logical_id()).unwrap()["Properties"];
        assert_eq!(properties["StreamModeDetails"]["StreamMode"], "ON_DEMAND");
        assert!(properties.get("ShardCount").is_none());
    }

    #[test]
    fn test_should_validate_capacity() {
        let on_demand_with_shards = StreamProps {
            stream_mode: Some(StreamMode::OnDemand),
            shard_count: Some(2),
            ..Default::default()
        };
        assert!(stream(on_demand_with_shards, None).is_err());

        let no_shards = StreamProps {
            shard_count: Some(0),
            ..Default::default()
        };
        assert!(stream(no_shards, None).is_err());

        for hours in [23, 8761] {
            let props = StreamProps {
                retention_period_hours: Some(hours),
                ..Default::default()
            };
            assert!(stream(props, None).is_err());
        }
    }

    #[test]
    fn test_should_validate_stream_name() {
        let long = "s".repeat(129);

        for name in ["", "my stream", "stream/1", long.as_str()] {
            let props = StreamProps {
                stream_name: Some(name.to_string()),
                ..Default::default()
            };
            assert!(stream(props, None).is_err(), "{name:?} is accepted");
        }
    }
}
