mod config_file;
use crate::envs::Envs;
use config_file::ConfigFile;
use eyre::WrapErr;
use kinesis_stack_construct::{
    kinesis_stack, App, Environment, EnvironmentPolicy, KinesisStackProps, StackProps,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Config file expected in the project dir
pub(crate) const CONFIG_FILE: &str = "stack.toml";

/// The stack to synthesize, as configured in stack.toml
#[derive(Debug, Clone)]
pub(crate) struct Project {
    /// Dir with stack.toml
    pub(crate) path: PathBuf,

    /// Construct id of the stack
    pub(crate) id: String,

    pub(crate) stack_name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) tags: BTreeMap<String, String>,
    pub(crate) termination_protection: bool,

    /// How the account and region are chosen
    pub(crate) environment: EnvironmentPolicy,
}

impl Project {
    pub(crate) fn from_path(path: PathBuf) -> eyre::Result<Self> {
        Ok(ConfigFile::from_path(path)?.into())
    }

    pub(crate) fn from_current_dir() -> eyre::Result<Self> {
        Self::from_path(std::env::current_dir().wrap_err("Failed to get current dir")?)
    }

    /// Resolve the environment according to the policy
    ///
    /// The ambient policy reads process variables first, then the .env file.
    pub(crate) fn environment(&self) -> eyre::Result<Option<Environment>> {
        let dotenv = match self.environment {
            EnvironmentPolicy::Ambient => Envs::load(),
            _ => Default::default(),
        };

        self.environment
            .resolve_with(|name| Envs::lookup(&dotenv, name))
            .wrap_err("Failed to resolve the stack environment")
    }

    /// Assemble the app with the stack, writing into the dir if given
    ///
    /// Without an explicit dir the app uses CDK_OUTDIR or the default dir.
    pub(crate) fn app(&self, outdir: Option<PathBuf>) -> eyre::Result<App> {
        let mut app = match outdir {
            Some(outdir) => App::new(outdir),
            None => App::from_env(),
        };

        let props = KinesisStackProps {
            stack: StackProps {
                env: self.environment()?,
                stack_name: self.stack_name.clone(),
                description: self.description.clone(),
                tags: self.tags.clone(),
                termination_protection: self.termination_protection,
            },
        };

        kinesis_stack(&mut app, &self.id, Some(props))
            .wrap_err_with(|| format!("Failed to build stack {:?}", self.id))?;

        Ok(app)
    }
}
