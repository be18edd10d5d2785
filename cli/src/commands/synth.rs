mod runner;
use crate::commands::ProjectArgs;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use clap::ArgAction;
use runner::SynthRunner;
use std::path::PathBuf;

#[derive(clap::Args, Clone, Default)]
pub(crate) struct SynthCommand {
    #[command(flatten)]
    project: ProjectArgs,

    /// Directory of the cloud assembly (defaults to $CDK_OUTDIR or "cdk.out")
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Do not print templates, only write them
    #[arg(short, long, action = ArgAction::SetTrue)]
    quiet: bool,
}

impl Runnable for SynthCommand {
    fn runner<'a>(&self, writer: &'a Writer) -> impl Runner + 'a {
        SynthRunner {
            command: self.clone(),
            writer,
        }
    }
}
