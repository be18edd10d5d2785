use crate::commands::synth::SynthCommand;
use crate::error::Error;
use crate::runner::Runner;
use crate::writer::Writer;
use serde_json::json;
use std::path::Path;

pub(crate) struct SynthRunner<'a> {
    pub(crate) command: SynthCommand,
    pub(crate) writer: &'a Writer,
}

impl Runner for SynthRunner<'_> {
    fn project_dir(&self) -> Option<&Path> {
        self.command.project.dir.as_deref()
    }

    /// Build the stack and write the cloud assembly
    fn run(&mut self) -> Result<(), Error> {
        let project = self.project()?;

        let app = project
            .app(self.command.output.clone())
            .map_err(|e| self.error(Some("Failed to build the stack"), None, Some(e)))?;

        let assembly = app.synth().map_err(|e| {
            self.error(
                Some("Failed to synthesize"),
                Some("Check that the output directory is writable."),
                Some(e),
            )
        })?;

        for stack in &assembly.stacks {
            log::info!("Synthesized {} into {:?}", stack.id, stack.template_file);

            if !self.command.quiet {
                self.writer.text(&format!("{}\n", stack.template.to_json()?))?;
            }
        }

        self.writer.text(&format!(
            "{} Synthesized to {}\n",
            console::style("✓").green().bold(),
            assembly.directory.display()
        ))?;

        self.writer.json(json!({
            "directory": assembly.directory,
            "stacks": assembly.stacks.iter().map(|stack| json!({
                "id": stack.id,
                "stackName": stack.stack_name,
                "environment": stack.environment,
                "templateFile": stack.template_file,
                "template": stack.template,
            })).collect::<Vec<_>>(),
        }))?;

        Ok(())
    }
}
