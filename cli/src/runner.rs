use crate::{error::Error, project::Project, writer::Writer};
use std::path::Path;

pub(crate) trait Runner {
    /// Dir passed with --dir, the current dir is used when not set
    fn project_dir(&self) -> Option<&Path> {
        None
    }

    /// Project configured in the project dir
    fn project(&self) -> Result<Project, Error> {
        let project = match self.project_dir() {
            Some(dir) => Project::from_path(dir.to_path_buf()),
            None => Project::from_current_dir(),
        };

        project.map_err(|e| {
            self.error(
                Some("Invalid project config"),
                Some("Check stack.toml in the project directory."),
                Some(e),
            )
        })
    }

    /// Run the command
    ///
    /// Returns an error shown to the user in case of failure
    fn run(&mut self) -> Result<(), Error>;

    /// Construct an error shown to the user
    fn error(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        origin: Option<eyre::Report>,
    ) -> Error {
        if let Some(origin) = origin {
            log::error!("{origin:?}");
        }

        if let Some(title) = title {
            Error::new(title, description)
        } else {
            Error::new("Failed to run the command", Some("Run again with RUST_LOG=debug for details."))
        }
    }
}

/// Return a runner for a command
pub(crate) trait Runnable {
    fn runner<'a>(&self, writer: &'a Writer) -> impl Runner + 'a;
}
