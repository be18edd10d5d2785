mod commands;
mod envs;
mod error;
mod logger;
mod project;
mod runner;
mod writer;
use crate::commands::Commands;
use crate::error::Error;
use crate::logger::Logger;
use crate::runner::{Runnable, Runner};
use crate::writer::Writer;
use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(
    name = "kinesis-stack",
    version,
    about = "Synthesize the KMS-encrypted Kinesis stack",
    long_about = "Builds a stack with a rotated KMS key and a Kinesis data stream encrypted with it, and writes it as a CloudFormation cloud assembly. Deployment is left to CloudFormation tooling."
)]
struct Cli {
    /// Print JSON instead of human-readable text
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    structured: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Derive a runner from the command and run it
fn run(command: impl Runnable, writer: &Writer) -> Result<(), Error> {
    command.runner(writer).run()
}

fn main() {
    Logger::init();

    if let Err(error) = color_eyre::install() {
        log::warn!("Failed to install error report handler: {error:?}");
    }

    let cli = Cli::parse();
    let writer = Writer::new(cli.structured);

    // Match all commands here, in one place
    let result = match cli.command {
        Commands::Synth(cmd) => run(cmd, &writer),
        Commands::List(cmd) => run(cmd, &writer),
        Commands::Env(cmd) => run(cmd, &writer),
    };

    // The error is terminating, nothing is retried
    if let Err(error) = result {
        let message = if writer.is_structured() {
            serde_json::json!({
                "error": error.message(),
                "details": error.details(),
            })
            .to_string()
        } else {
            format!("{}\n{error}", console::style("Error").red().bold())
        };

        // The writer already logged the failure, the message must not be lost
        if writer.error(&format!("\n{message}\n")).is_err() {
            eprintln!("{message}");
        }

        std::process::exit(1);
    }
}
