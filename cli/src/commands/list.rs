use crate::commands::ProjectArgs;
use crate::error::Error;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use kinesis_stack_construct::Environment;
use serde_json::json;
use std::path::Path;

#[derive(clap::Args, Clone, Default)]
pub(crate) struct ListCommand {
    #[command(flatten)]
    project: ProjectArgs,
}

impl Runnable for ListCommand {
    fn runner<'a>(&self, writer: &'a Writer) -> impl Runner + 'a {
        ListRunner {
            command: self.clone(),
            writer,
        }
    }
}

pub(crate) struct ListRunner<'a> {
    command: ListCommand,
    writer: &'a Writer,
}

impl Runner for ListRunner<'_> {
    fn project_dir(&self) -> Option<&Path> {
        self.command.project.dir.as_deref()
    }

    /// Print every stack id and its aws://account/region
    fn run(&mut self) -> Result<(), Error> {
        let project = self.project()?;

        // Nothing is written, so the dir does not matter
        let app = project
            .app(None)
            .map_err(|e| self.error(Some("Failed to build the stack"), None, Some(e)))?;

        let stacks = app
            .stacks()
            .iter()
            .map(|stack| (stack.artifact_id(), Environment::uri(stack.environment())))
            .collect::<Vec<_>>();

        for (id, environment) in &stacks {
            self.writer.text(&format!("{id}\t{environment}\n"))?;
        }

        self.writer.json(json!({
            "project": project.path,
            "stacks": stacks
                .iter()
                .map(|(id, environment)| json!({ "id": id, "environment": environment }))
                .collect::<Vec<_>>(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::CONFIG_FILE;

    fn list(writer: &Writer, dir: &Path) -> Result<(), Error> {
        let command = ListCommand {
            project: ProjectArgs {
                dir: Some(dir.to_path_buf()),
            },
        };

        command.runner(writer).run()
    }

    #[test]
    fn test_should_list_stack_with_environment() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::buffered(false);

        list(&writer, dir.path()).unwrap();
        assert_eq!(
            writer.out(),
            "KinesisStack\taws://unknown-account/unknown-region\n"
        );
    }

    #[test]
    fn test_should_list_configured_stack_as_json() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[stack]\nid = \"Streams\"\n\n[environment]\npolicy = \"fixed\"\naccount = \"123456789012\"\nregion = \"us-east-1\"\n",
        )
        .unwrap();

        let writer = Writer::buffered(true);
        list(&writer, dir.path()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&writer.out()).unwrap();
        assert_eq!(value["project"], json!(dir.path()));
        assert_eq!(
            value["stacks"],
            json!([{ "id": "Streams", "environment": "aws://123456789012/us-east-1" }])
        );
    }
}
