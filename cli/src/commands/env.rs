use crate::commands::ProjectArgs;
use crate::error::Error;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use serde_json::json;
use std::path::Path;

#[derive(clap::Args, Clone, Default)]
pub(crate) struct EnvCommand {
    #[command(flatten)]
    project: ProjectArgs,
}

impl Runnable for EnvCommand {
    fn runner<'a>(&self, writer: &'a Writer) -> impl Runner + 'a {
        EnvRunner {
            command: self.clone(),
            writer,
        }
    }
}

pub(crate) struct EnvRunner<'a> {
    command: EnvCommand,
    writer: &'a Writer,
}

impl Runner for EnvRunner<'_> {
    fn project_dir(&self) -> Option<&Path> {
        self.command.project.dir.as_deref()
    }

    /// Resolve the configured policy without building the stack
    fn run(&mut self) -> Result<(), Error> {
        let project = self.project()?;

        let environment = project.environment().map_err(|e| {
            self.error(
                Some("Failed to resolve the environment"),
                Some("Check the [environment] section of stack.toml."),
                Some(e),
            )
        })?;

        match &environment {
            Some(environment) => self.writer.text(&format!("{environment}\n"))?,
            None => self.writer.text("agnostic (no account or region)\n")?,
        }

        self.writer.json(json!({
            "policy": project.environment,
            "account": environment.as_ref().and_then(|e| e.account()),
            "region": environment.as_ref().and_then(|e| e.region()),
        }))
    }
}
