pub mod env;
pub mod list;
pub mod synth;
use clap::Subcommand;
use std::path::PathBuf;

/// Where the project lives, shared by all commands
#[derive(clap::Args, Clone, Debug, Default)]
pub(crate) struct ProjectArgs {
    /// Directory with stack.toml (defaults to the current dir)
    #[arg(short = 'C', long = "dir", value_name = "DIR")]
    pub(crate) dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Render the stack into a CloudFormation cloud assembly
    Synth(synth::SynthCommand),

    /// List stacks of the app with their environments
    #[command(alias = "ls")]
    List(list::ListCommand),

    /// Show the environment the stack is bound to
    Env(env::EnvCommand),
}
