use super::{Project, CONFIG_FILE};
use eyre::WrapErr;
use kinesis_stack_construct::{EnvironmentPolicy, STACK_ID};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// ConfigFile is the structure of stack.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ConfigFile {
    /// [stack]
    /// id = "KinesisStack"
    #[serde(default)]
    stack: StackSection,

    /// [environment]
    /// policy = "agnostic"
    #[serde(default)]
    environment: EnvironmentPolicy,

    #[serde(skip)]
    path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct StackSection {
    #[serde(default = "default_id")]
    id: String,

    stack_name: Option<String>,
    description: Option<String>,

    #[serde(default)]
    tags: BTreeMap<String, String>,

    #[serde(default)]
    termination_protection: bool,
}

fn default_id() -> String {
    STACK_ID.to_string()
}

impl Default for StackSection {
    fn default() -> Self {
        StackSection {
            id: default_id(),
            stack_name: None,
            description: None,
            tags: BTreeMap::new(),
            termination_protection: false,
        }
    }
}

impl ConfigFile {
    /// Reads a `ConfigFile` from a given directory path
    ///
    /// Falls back to the default config (the "KinesisStack" stack, environment-agnostic)
    /// if stack.toml is not present in the directory.
    pub(super) fn from_path(path: PathBuf) -> eyre::Result<Self> {
        let config_toml_path = path.join(CONFIG_FILE);

        let Ok(toml_string) = fs::read_to_string(&config_toml_path) else {
            log::debug!("No {config_toml_path:?} found, using defaults");

            return Ok(Self {
                path,
                ..Default::default()
            });
        };

        let mut config: ConfigFile = toml::from_str(&toml_string)
            .wrap_err_with(|| format!("Failed to parse {config_toml_path:?}"))?;

        config.path = path;
        Ok(config)
    }
}

impl From<ConfigFile> for Project {
    fn from(cfg: ConfigFile) -> Self {
        Project {
            path: cfg.path,
            id: cfg.stack.id,
            stack_name: cfg.stack.stack_name,
            description: cfg.stack.description,
            tags: cfg.stack.tags,
            termination_protection: cfg.stack.termination_protection,
            environment: cfg.environment,
        }
    }
}
