use crate::construct::{App, Stack, StackProps};
use crate::kinesis::{StreamEncryption, StreamProps};
use crate::kms::KeyProps;

/// Id of the stack when not configured otherwise
pub const STACK_ID: &str = "KinesisStack";

pub const KEY_ID: &str = "KinesisEncryptionKey";
pub const STREAM_ID: &str = "MyStream";

/// Physical name of the data stream
pub const STREAM_NAME: &str = "MyKinesisDataStream";

#[derive(Clone, Debug, Default)]
pub struct KinesisStackProps {
    pub stack: StackProps,
}

/// Declare a stack with a rotated KMS key and a stream encrypted with it
pub fn kinesis_stack<'a>(
    app: &'a mut App,
    id: &str,
    props: Option<KinesisStackProps>,
) -> eyre::Result<&'a Stack> {
    let props = props.unwrap_or_default();
    let stack = app.stack(id, props.stack)?;

    let key = stack.key(
        KEY_ID,
        KeyProps {
            enable_key_rotation: true,
            ..Default::default()
        },
    )?;

    stack.stream(
        STREAM_ID,
        StreamProps {
            stream_name: Some(STREAM_NAME.to_string()),
            encryption: Some(StreamEncryption::Kms),
            encryption_key: Some(key),
            ..Default::default()
        },
    )?;

    Ok(&*stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;

    #[test]
    fn test_should_declare_key_before_stream() {
        let mut app = App::new("out");
        let stack = kinesis_stack(&mut app, STACK_ID, None).unwrap();

        let ids: Vec<&str> = stack
            .resources()
            .iter()
            .map(|resource| match resource {
                crate::construct::Resource::Key(key) => key.node().id(),
                crate::construct::Resource::Stream(stream) => stream.node().id(),
            })
            .collect();

        assert_eq!(ids, [KEY_ID, STREAM_ID]);
    }

    #[test]
    fn test_should_pass_environment_through() {
        let mut app = App::new("out");
        let env = Environment::new("123456789012", "us-east-1").unwrap();

        let props = KinesisStackProps {
            stack: StackProps {
                env: Some(env.clone()),
                ..Default::default()
            },
        };

        let stack = kinesis_stack(&mut app, "Prod", Some(props)).unwrap();
        assert_eq!(stack.environment(), Some(&env));
    }
}
