use crate::assembly::{self, CloudAssembly};
use crate::env::Environment;
use crate::kinesis::{Stream, StreamProps};
use crate::kms::{Key, KeyProps, KeyRef};
use crate::template::Template;
use eyre::{ContextCompat, WrapErr};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Separator of construct ids in a path
pub const PATH_SEP: &str = "/";

/// Directory of the cloud assembly when nothing else is configured
pub const DEFAULT_OUTDIR: &str = "cdk.out";

/// Overrides the cloud assembly directory
pub const OUTDIR_VARIABLE: &str = "CDK_OUTDIR";

const MAX_STACK_NAME_LEN: usize = 128;
const MAX_DESCRIPTION_LEN: usize = 1024;

static STACK_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("Valid stack name regex"));

/// Position of a construct in the tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    id: String,
    path: String,
}

impl Node {
    /// Node directly under the app, i.e. a stack
    pub(crate) fn root(id: &str) -> eyre::Result<Self> {
        let id = sanitize_id(id)?;

        Ok(Node {
            path: id.clone(),
            id,
        })
    }

    pub(crate) fn child(&self, id: &str) -> eyre::Result<Self> {
        let id = sanitize_id(id)?;

        Ok(Node {
            path: format!("{}{PATH_SEP}{id}", self.path),
            id,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Id of the stack the node belongs to
    pub fn stack_id(&self) -> &str {
        self.path.split(PATH_SEP).next().unwrap_or_default()
    }

    /// Path components below the stack
    pub(crate) fn components(&self) -> Vec<&str> {
        self.path.split(PATH_SEP).skip(1).collect()
    }
}

/// Ids can't be empty, path separators are replaced
fn sanitize_id(id: &str) -> eyre::Result<String> {
    if id.is_empty() {
        eyre::bail!("Only the root construct may have an empty id");
    }

    Ok(id.replace(PATH_SEP, "--"))
}

/// The root of the construct tree
///
/// Holds stacks and synthesizes them into a cloud assembly.
#[derive(Clone, Debug)]
pub struct App {
    outdir: PathBuf,
    stacks: Vec<Stack>,
}

impl App {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        App {
            outdir: outdir.into(),
            stacks: vec![],
        }
    }

    /// App writing into CDK_OUTDIR, or into "cdk.out" if the var is not set
    pub fn from_env() -> Self {
        let outdir = std::env::var(OUTDIR_VARIABLE)
            .ok()
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTDIR.to_string());

        Self::new(outdir)
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Declare a new stack in the app
    pub fn stack(&mut self, id: &str, props: StackProps) -> eyre::Result<&mut Stack> {
        let node = Node::root(id).wrap_err("Invalid stack id")?;

        if self.find(node.id()).is_some() {
            eyre::bail!("There is already a construct with id {:?} in the app", node.id());
        }

        let stack = Stack::new(node, props)?;
        log::debug!("Declared stack {}", stack.node.path());
        self.stacks.push(stack);

        self.stacks
            .last_mut()
            .wrap_err("Stack is missing right after declaration")
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn find(&self, id: &str) -> Option<&Stack> {
        self.stacks.iter().find(|stack| stack.node.id() == id)
    }

    /// Render all stacks and write them to the output dir
    pub fn synth(&self) -> eyre::Result<CloudAssembly> {
        assembly::write(&self.outdir, &self.stacks)
    }
}

/// Stack-wide settings
#[derive(Clone, Debug, Default)]
pub struct StackProps {
    /// Deployment target, the stack is environment-agnostic when not set
    pub env: Option<Environment>,

    /// Name of the deployed CFN stack, defaults to the stack id
    pub stack_name: Option<String>,

    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub termination_protection: bool,
}

/// Resources a stack can hold
#[derive(Clone, Debug)]
pub enum Resource {
    Key(Key),
    Stream(Stream),
}

impl Resource {
    /// CFN logical ids the resource renders, a stream may carry its own key
    fn logical_ids(&self) -> Vec<&str> {
        match self {
            Resource::Key(key) => vec![key.logical_id()],
            Resource::Stream(stream) => std::iter::once(stream.logical_id())
                .chain(stream.own_key().map(Key::logical_id))
                .collect(),
        }
    }
}

/// A named container of resources, rendered into one CFN template
#[derive(Clone, Debug)]
pub struct Stack {
    node: Node,
    stack_name: String,
    props: StackProps,
    resources: Vec<Resource>,
}

impl Stack {
    fn new(node: Node, props: StackProps) -> eyre::Result<Self> {
        let stack_name = props
            .stack_name
            .clone()
            .unwrap_or_else(|| node.id().to_string());

        if stack_name.len() > MAX_STACK_NAME_LEN || !STACK_NAME_REGEX.is_match(&stack_name) {
            eyre::bail!(
                "Stack name {stack_name:?} must start with a letter, contain only letters, digits and hyphens and be at most {MAX_STACK_NAME_LEN} characters"
            );
        }

        if let Some(description) = &props.description {
            if description.len() > MAX_DESCRIPTION_LEN {
                eyre::bail!("Stack description must be at most {MAX_DESCRIPTION_LEN} bytes");
            }
        }

        Ok(Stack {
            node,
            stack_name,
            props,
            resources: vec![],
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Id of the stack artifact in the cloud assembly
    pub fn artifact_id(&self) -> &str {
        self.node.id()
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn props(&self) -> &StackProps {
        &self.props
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.props.env.as_ref()
    }

    pub fn region(&self) -> Option<&str> {
        self.environment().and_then(Environment::region)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Keys declared directly in the stack
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.resources.iter().filter_map(|resource| match resource {
            Resource::Key(key) => Some(key),
            _ => None,
        })
    }

    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.resources.iter().filter_map(|resource| match resource {
            Resource::Stream(stream) => Some(stream),
            _ => None,
        })
    }

    /// Declare a KMS key, the returned reference is used to encrypt other resources
    pub fn key(&mut self, id: &str, props: KeyProps) -> eyre::Result<KeyRef> {
        let node = self.child(id)?;
        let key = Key::new(node, props).wrap_err_with(|| format!("Invalid key {id:?}"))?;
        let reference = key.reference();

        let path = key.node().path().to_string();
        self.push(Resource::Key(key))?;
        log::debug!("Declared key {path}");
        Ok(reference)
    }

    /// Declare a Kinesis stream
    pub fn stream(&mut self, id: &str, props: StreamProps) -> eyre::Result<&Stream> {
        let node = self.child(id)?;

        if let Some(key) = &props.encryption_key {
            self.ensure_owns(key)?;
        }

        let stream = Stream::new(node, props, self.region())
            .wrap_err_with(|| format!("Invalid stream {id:?}"))?;

        let path = stream.node().path().to_string();
        self.push(Resource::Stream(stream))?;
        log::debug!("Declared stream {path}");

        match self.resources.last() {
            Some(Resource::Stream(stream)) => Ok(stream),
            _ => eyre::bail!("Stream is missing right after declaration"),
        }
    }

    /// Render the CFN template
    pub fn template(&self) -> eyre::Result<Template> {
        let mut template = Template::new(self.props.description.clone());

        for resource in &self.resources {
            match resource {
                Resource::Key(key) => key.synthesize(&mut template)?,

                Resource::Stream(stream) => {
                    if let Some(key) = stream.encryption_key() {
                        self.ensure_owns(key)?;
                    }

                    stream.synthesize(&mut template)?;
                }
            }
        }

        Ok(template)
    }

    /// New child node, its id must be unique among the stack children
    fn child(&self, id: &str) -> eyre::Result<Node> {
        let node = self.node.child(id)?;

        let taken = self.resources.iter().any(|resource| match resource {
            Resource::Key(key) => key.node().id() == node.id(),
            Resource::Stream(stream) => stream.node().id() == node.id(),
        });

        if taken {
            eyre::bail!(
                "There is already a construct with id {:?} in stack {}",
                node.id(),
                self.node.id()
            );
        }

        Ok(node)
    }

    /// Add a resource unless one of its logical ids is already rendered by the stack
    ///
    /// Different paths can map to one logical id, e.g. a key "Key" and the own
    /// key of a stream "Default" both end up as "Key/Resource".
    fn push(&mut self, resource: Resource) -> eyre::Result<()> {
        let taken: Vec<&str> = self
            .resources
            .iter()
            .flat_map(Resource::logical_ids)
            .collect();

        if let Some(id) = resource
            .logical_ids()
            .into_iter()
            .find(|id| taken.contains(id))
        {
            eyre::bail!(
                "Duplicate logical id {id:?} in stack {}, use another construct id",
                self.node.id()
            );
        }

        self.resources.push(resource);
        Ok(())
    }

    /// A key is usable only by the stack that declared it
    fn ensure_owns(&self, key: &KeyRef) -> eyre::Result<()> {
        let declared = self.keys().any(|k| &k.reference() == key)
            || self
                .streams()
                .filter_map(Stream::own_key)
                .any(|k| &k.reference() == key);

        if !declared {
            eyre::bail!(
                "Key {} is not declared in stack {}",
                key.path(),
                self.node.id()
            );
        }

        Ok(())
    }
}
