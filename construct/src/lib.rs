//! Declarative constructs for a KMS-encrypted Kinesis data stream.
//!
//! Constructs form a tree: an [`App`] holds stacks, a [`Stack`] holds resources.
//! Nothing is provisioned here, the tree is only rendered into CloudFormation
//! templates written into a cloud assembly dir.
//!
//! ```no_run
//! use kinesis_stack_construct::{kinesis_stack, App, STACK_ID};
//!
//! let mut app = App::from_env();
//! kinesis_stack(&mut app, STACK_ID, None)?;
//! app.synth()?;
//! # Ok::<(), eyre::Report>(())
//! ```

pub mod assembly;
pub mod construct;
pub mod env;
pub mod kinesis;
mod kinesis_stack;
pub mod kms;
mod logical_id;
pub mod template;

pub use assembly::CloudAssembly;
pub use construct::{App, Node, Resource, Stack, StackProps};
pub use env::{Environment, EnvironmentPolicy};
pub use kinesis_stack::{
    kinesis_stack, KinesisStackProps, KEY_ID, STACK_ID, STREAM_ID, STREAM_NAME,
};
pub use template::{RemovalPolicy, Template};
