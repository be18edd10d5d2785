//! Cloud assembly: the directory with stack templates and a manifest
//! describing them, consumed by deployment tooling.

use crate::construct::Stack;
use crate::env::Environment;
use crate::template::Template;
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "36.0.0";
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Result of a synthesis
#[derive(Clone, Debug)]
pub struct CloudAssembly {
    pub directory: PathBuf,
    pub manifest: Manifest,
    pub stacks: Vec<StackArtifact>,
}

impl CloudAssembly {
    pub fn stack(&self, id: &str) -> Option<&StackArtifact> {
        self.stacks.iter().find(|stack| stack.id == id)
    }
}

/// A rendered stack and the file it was written to
#[derive(Clone, Debug)]
pub struct StackArtifact {
    pub id: String,
    pub stack_name: String,
    pub environment: String,
    pub template_file: PathBuf,
    pub template: Template,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: BTreeMap<String, Artifact>,
}

impl Manifest {
    /// Read manifest.json from an assembly dir
    pub fn from_path(directory: &Path) -> eyre::Result<Self> {
        let path = directory.join(MANIFEST_FILE);

        let content = fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read manifest {path:?}"))?;

        serde_json::from_str(&content).wrap_err_with(|| format!("Failed to parse manifest {path:?}"))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,

    /// In aws://account/region form
    pub environment: String,

    pub properties: ArtifactProperties,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    /// Relative to the assembly dir
    pub template_file: String,

    /// Only set when it differs from the artifact id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub termination_protection: bool,
}

/// Render the stacks, write templates and the manifest into the dir
pub(crate) fn write(directory: &Path, stacks: &[Stack]) -> eyre::Result<CloudAssembly> {
    fs::create_dir_all(directory)
        .inspect_err(|e| log::error!("Failed to create assembly dir {directory:?}: {e:?}"))
        .wrap_err_with(|| format!("Failed to create {directory:?}"))?;

    let mut manifest = Manifest {
        version: MANIFEST_VERSION.to_string(),
        artifacts: BTreeMap::new(),
    };

    let mut artifacts = Vec::with_capacity(stacks.len());

    for stack in stacks {
        let template = stack
            .template()
            .wrap_err_with(|| format!("Failed to render stack {}", stack.artifact_id()))?;

        let file_name = format!("{}.template.json", stack.artifact_id());
        let template_file = directory.join(&file_name);

        fs::write(&template_file, template.to_json()?)
            .wrap_err_with(|| format!("Failed to write template {template_file:?}"))?;

        log::info!("Wrote template {template_file:?}");

        let environment = Environment::uri(stack.environment());
        let props = stack.props();

        manifest.artifacts.insert(
            stack.artifact_id().to_string(),
            Artifact {
                kind: STACK_ARTIFACT_TYPE.to_string(),
                environment: environment.clone(),
                properties: ArtifactProperties {
                    template_file: file_name,
                    stack_name: (stack.stack_name() != stack.artifact_id())
                        .then(|| stack.stack_name().to_string()),
                    tags: props.tags.clone(),
                    termination_protection: props.termination_protection,
                },
                display_name: stack.node().path().to_string(),
            },
        );

        artifacts.push(StackArtifact {
            id: stack.artifact_id().to_string(),
            stack_name: stack.stack_name().to_string(),
            environment,
            template_file,
            template,
        });
    }

    let manifest_path = directory.join(MANIFEST_FILE);
    let manifest_json =
        serde_json::to_string_pretty(&manifest).wrap_err("Failed to serialize manifest")?;

    fs::write(&manifest_path, manifest_json)
        .wrap_err_with(|| format!("Failed to write manifest {manifest_path:?}"))?;

    log::info!("Wrote manifest {manifest_path:?}");

    Ok(CloudAssembly {
        directory: directory.to_path_buf(),
        manifest,
        stacks: artifacts,
    })
}
